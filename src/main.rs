use std::time::{Duration, Instant};

use anyhow::Context;
use avatar_client::{
    config::ClientConfig,
    services::{
        connection::ConnectionEvent,
        notice_board::NoticeLevel,
        recorder::ClipFileCapture,
        session_manager::{ChatSession, MessageRole},
    },
    state::AppState,
    views::{Shell, View, gallery::{Gallery, GalleryView}, upload::{FileInput, UploadForm}},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Everything the loop reacts to, funnelled through one channel.
enum Input {
    Line(String),
    /// Socket event tagged with the chat generation it belongs to.
    Socket(u64, ConnectionEvent),
}

/// What the terminal has already shown of the current chat.
#[derive(Default)]
struct ChatScreen {
    generation: u64,
    printed: usize,
    video: Option<String>,
}

struct Repl {
    state: AppState,
    shell: Shell,
    upload: UploadForm,
    gallery: Gallery,
    capture: Option<ClipFileCapture>,
    screen: ChatScreen,
    inputs: mpsc::UnboundedSender<Input>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("avatar_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("loading configuration")?;
    let state = AppState::new(config);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stdin_tx.send(Input::Line(line)).is_err() {
                break;
            }
        }
    });

    let mut repl = Repl {
        upload: state.upload_form(),
        gallery: state.gallery(),
        state,
        shell: Shell::new(),
        capture: None,
        screen: ChatScreen::default(),
        inputs: tx,
    };

    println!("AI Avatar System: create and talk to your avatar. Type `help`.");
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            input = rx.recv() => match input {
                Some(Input::Line(line)) => {
                    if !repl.handle_line(line.trim()).await {
                        break;
                    }
                }
                Some(Input::Socket(generation, event)) => repl.handle_socket(generation, event).await,
                None => break,
            },
            _ = tick.tick() => {
                if let Some(chat) = repl.shell.chat_mut() {
                    chat.check_processing_timeout(Instant::now()).await;
                }
                repl.state.notices.purge_expired().await;
            }
        }
        repl.render().await;
    }

    repl.shell.show_manage();
    Ok(())
}

impl Repl {
    /// Returns `false` when the user asked to quit.
    async fn handle_line(&mut self, line: &str) -> bool {
        if line == "quit" || line == "/quit" {
            return false;
        }
        match self.shell.view() {
            View::Manage => self.manage_command(line).await,
            View::Chat => self.chat_command(line).await,
        }
        true
    }

    async fn manage_command(&mut self, line: &str) {
        if self.gallery.pending_delete().is_some() {
            let confirmed = matches!(line.to_lowercase().as_str(), "y" | "yes");
            self.gallery
                .confirm_delete(confirmed, &self.state.api, self.shell.selection_mut())
                .await;
            return;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => {}
            "help" => print_help(),
            "list" => self.print_gallery().await,
            "upload" => match rest.trim().rsplit_once(' ') {
                Some((name, path)) => {
                    let file = FileInput::from_path(path)
                        .await
                        .with_context(|| format!("reading {path}"));
                    match file {
                        Ok(file) => {
                            if self.upload.choose_file(file).await {
                                self.upload.set_name(name.trim());
                                self.upload.submit(&self.state.api, &self.state.avatars).await;
                            }
                        }
                        Err(e) => println!("{e:#}"),
                    }
                }
                None => println!("usage: upload <name> <image path>"),
            },
            "select" if !rest.is_empty() => {
                self.gallery.select(self.shell.selection_mut(), rest.trim());
                println!("selected {}", rest.trim());
            }
            "delete" if !rest.is_empty() => {
                self.gallery.request_delete(rest.trim());
                println!("Are you sure you want to delete this avatar? [y/N]");
            }
            "chat" => self.start_chat().await,
            other => println!("unknown command `{other}`; try `help`"),
        }
    }

    async fn chat_command(&mut self, line: &str) {
        if line == "/back" {
            self.shell.show_manage();
            self.capture = None;
            println!("back to avatar management");
            return;
        }
        let Some(chat) = self.shell.chat_mut() else {
            return;
        };

        if let Some(path) = line.strip_prefix("/record ") {
            let mut capture = ClipFileCapture::new(path.trim());
            if chat.start_recording(&mut capture).await {
                self.capture = Some(capture);
            }
        } else if line == "/stop" {
            match self.capture.take() {
                Some(mut capture) => {
                    if let Err(reason) = chat.stop_recording(&mut capture).await {
                        println!("(clip not sent: {reason})");
                    }
                }
                None => println!("(not recording)"),
            }
        } else if line == "/ping" {
            if let Err(reason) = chat.ping().await {
                println!("(ping not sent: {reason})");
            }
        } else {
            chat.set_input(line);
            if let Err(reason) = chat.send_text().await {
                println!("(not sent: {reason})");
            }
        }
    }

    async fn start_chat(&mut self) {
        let Some(chat) = self.shell.enter_chat(&self.state) else {
            println!("select an avatar first");
            return;
        };
        self.screen = ChatScreen { generation: self.screen.generation + 1, ..Default::default() };

        // Ctrl-C while the session is being created abandons it.
        let token = chat.lifetime_token();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
        let events = chat.mount(&self.state.api, &self.state.connector).await;
        interrupt.abort();

        match events {
            Some(mut events) => {
                let generation = self.screen.generation;
                let tx = self.inputs.clone();
                tokio::spawn(async move {
                    while let Some(event) = events.recv().await {
                        if tx.send(Input::Socket(generation, event)).is_err() {
                            break;
                        }
                    }
                });
                println!("chatting with {}. `/record <clip>`, `/stop`, `/back`", chat.avatar_id());
            }
            None => {
                self.shell.show_manage();
            }
        }
    }

    async fn handle_socket(&mut self, generation: u64, event: ConnectionEvent) {
        if generation != self.screen.generation {
            return;
        }
        if let Some(chat) = self.shell.chat_mut() {
            chat.handle_event(event).await;
        }
    }

    async fn print_gallery(&self) {
        match self.gallery.load(&self.state.api, self.shell.selection()).await {
            GalleryView::Empty => println!("No avatars yet. Upload your first avatar!"),
            GalleryView::Items(items) => {
                for item in items {
                    let mark = if item.selected { "*" } else { " " };
                    println!(
                        "{mark} {}  {}  [{}]  {}",
                        item.avatar.id,
                        item.avatar.name,
                        item.avatar.status,
                        item.display_url.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
    }

    async fn render(&mut self) {
        if let Some(chat) = self.shell.chat() {
            render_chat(chat, &mut self.screen);
        }
        for notice in self.state.notices.drain().await {
            let tag = match notice.level {
                NoticeLevel::Success => "ok",
                NoticeLevel::Info => "info",
                NoticeLevel::Loading => "...",
                NoticeLevel::Error => "error",
            };
            println!("[{tag}] {}", notice.text);
        }
    }
}

fn render_chat(chat: &ChatSession, screen: &mut ChatScreen) {
    for entry in chat.transcript().iter().skip(screen.printed) {
        let who = match entry.role {
            MessageRole::User => "you",
            MessageRole::Assistant => "avatar",
        };
        let at = entry.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S");
        println!("{at} {who}: {}", entry.content);
    }
    screen.printed = chat.transcript().len();

    let current = chat.current_video().map(|v| v.url.as_str());
    if current.is_some() && current != screen.video.as_deref() {
        screen.video = current.map(str::to_string);
        println!("> playing {}", current.unwrap_or_default());
    }
}

fn print_help() {
    println!("  list                       show your avatars");
    println!("  upload <name> <image>      upload an avatar image");
    println!("  select <id>                pick the avatar to chat with");
    println!("  delete <id>                delete an avatar (asks first)");
    println!("  chat                       start a conversation");
    println!("  quit                       exit");
}
