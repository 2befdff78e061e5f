//! The interactive command loop.

use std::io::Write;
use std::sync::Arc;

use confab_auth::manager::SessionManager;
use confab_core::models::chat::{Chat, Sender};
use confab_sync::controller::Controller;

pub struct Repl {
    sessions: Arc<SessionManager>,
    controller: Controller,
    /// The chats as last listed, so `open <n>` can resolve a number.
    listed: Vec<Chat>,
}

impl Repl {
    pub fn new(sessions: Arc<SessionManager>, controller: Controller) -> Self {
        Self {
            sessions,
            controller,
            listed: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> eyre::Result<()> {
        println!("confab (type `help` for commands)");
        match self.sessions.peek_session().await {
            Some(session) => {
                println!("signed in as {}", session.user.email);
                self.list_chats().await.ok();
            }
            None => println!("not signed in (try `signin <email> <password>`)"),
        }

        let stdin = std::io::stdin();
        loop {
            print!("confab> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }
            match self.dispatch(line.trim()).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => println!("error: {e:#}"),
            }
        }

        self.controller.teardown().await;
        Ok(())
    }

    /// Returns false when the loop should stop.
    async fn dispatch(&mut self, line: &str) -> eyre::Result<bool> {
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            "" => {}
            "help" | "?" => help(),
            "signup" => self.sign_up(rest).await?,
            "signin" => self.sign_in(rest).await?,
            "signout" => self.sign_out().await,
            "whoami" => self.whoami().await,
            "chats" => self.list_chats().await?,
            "new" => self.new_chat(rest).await?,
            "open" => self.open(rest).await?,
            "show" => self.show().await,
            "send" => self.send(rest).await?,
            "close" => {
                self.controller.close_chat().await;
                println!("chat closed");
            }
            "quit" | "exit" => return Ok(false),
            other => println!("unknown command: {other} (try `help`)"),
        }
        Ok(true)
    }

    async fn sign_up(&mut self, rest: &str) -> eyre::Result<()> {
        let (email, password) = credentials(rest, "signup")?;
        let session = self.sessions.sign_up(email, password).await?;
        println!("account created; signed in as {}", session.user.email);
        self.list_chats().await
    }

    async fn sign_in(&mut self, rest: &str) -> eyre::Result<()> {
        let (email, password) = credentials(rest, "signin")?;
        let session = self.sessions.sign_in(email, password).await?;
        println!("signed in as {}", session.user.email);
        self.list_chats().await
    }

    async fn sign_out(&mut self) {
        self.controller.teardown().await;
        self.sessions.sign_out().await;
        self.listed.clear();
        println!("signed out");
    }

    async fn whoami(&self) {
        match self.sessions.peek_session().await {
            Some(session) => {
                let name = session
                    .user
                    .display_name
                    .unwrap_or_else(|| session.user.email.clone());
                println!("{name} <{}> (user {})", session.user.email, session.user.id);
            }
            None => println!("not signed in"),
        }
    }

    async fn list_chats(&mut self) -> eyre::Result<()> {
        let chats = self.controller.refresh_chats().await?;
        if chats.is_empty() {
            println!("no chats yet (try `new <title>`)");
        }
        for (i, chat) in chats.iter().enumerate() {
            println!("{:>3}. {}  ({})", i + 1, chat.title, chat.updated_at);
        }
        self.listed = chats;
        Ok(())
    }

    async fn new_chat(&mut self, rest: &str) -> eyre::Result<()> {
        let title = if rest.is_empty() { "New chat" } else { rest };
        let chat = self.controller.create_chat(title).await?;
        println!("created \"{}\"", chat.title);
        self.listed.insert(0, chat);
        self.show().await;
        Ok(())
    }

    async fn open(&mut self, rest: &str) -> eyre::Result<()> {
        if rest.is_empty() {
            return Err(eyre::eyre!("usage: open <number|chat-id>"));
        }
        let chat_id = match rest.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.listed.len() => self.listed[n - 1].id.clone(),
            _ => rest.to_string(),
        };
        self.controller.open_chat(&chat_id).await?;
        self.show().await;
        Ok(())
    }

    async fn show(&self) {
        let snapshot = self.controller.snapshot().await;
        let Some(chat_id) = snapshot.active_chat_id else {
            println!("no chat open (try `open <n>`)");
            return;
        };
        let title = snapshot
            .chats
            .iter()
            .find(|c| c.id == chat_id)
            .map(|c| c.title.clone())
            .unwrap_or_else(|| chat_id.clone());
        println!("--- {title} ---");
        if snapshot.messages.is_empty() {
            println!("(no messages)");
        }
        for message in &snapshot.messages {
            let who = match message.sender_type {
                Sender::User => "you",
                Sender::Bot => "bot",
            };
            println!("[{who}] {}", message.content);
        }
    }

    async fn send(&self, rest: &str) -> eyre::Result<()> {
        let snapshot = self.controller.snapshot().await;
        let chat_id = snapshot
            .active_chat_id
            .ok_or_else(|| eyre::eyre!("open a chat first"))?;
        let session = self
            .sessions
            .peek_session()
            .await
            .ok_or_else(|| eyre::eyre!("sign in first"))?;
        self.controller.send(&chat_id, &session.user.id, rest).await?;
        self.show().await;
        Ok(())
    }
}

fn credentials<'a>(rest: &'a str, command: &str) -> eyre::Result<(&'a str, &'a str)> {
    rest.split_once(char::is_whitespace)
        .map(|(email, password)| (email.trim(), password.trim()))
        .filter(|(email, password)| !email.is_empty() && !password.is_empty())
        .ok_or_else(|| eyre::eyre!("usage: {command} <email> <password>"))
}

fn help() {
    println!("  signup <email> <password>   create an account and sign in");
    println!("  signin <email> <password>   sign in");
    println!("  signout                     sign out and forget the session");
    println!("  whoami                      show the signed-in user");
    println!("  chats                       list chats, newest first");
    println!("  new [title]                 create a chat and open it");
    println!("  open <n|id>                 open a chat from the list");
    println!("  show                        reprint the open chat");
    println!("  send <text>                 send a message and wait for the reply");
    println!("  close                       leave the open chat");
    println!("  quit                        exit");
}
