use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use coldroom_session_delegate::{FileStore, MemoryStore, SessionStore};

#[derive(Parser, Debug, Clone)]
#[command(name = "coldroom-node", about = "Cold-storage marketplace demo node")]
pub struct Cli {
    /// HTTP port to listen on.
    #[arg(long, env = "COLDROOM_PORT", default_value_t = 3008)]
    pub port: u16,

    /// Delay before a simulated payment is confirmed, in milliseconds.
    #[arg(long, env = "COLDROOM_PAYMENT_DELAY_MS", default_value_t = 1500)]
    pub payment_delay_ms: u64,

    /// How often approved bookings past their end date are settled, in seconds.
    #[arg(long, env = "COLDROOM_SETTLE_INTERVAL_SECS", default_value_t = 60)]
    pub settle_interval_secs: u64,

    /// Session file (default: the user cache directory).
    #[arg(long, env = "COLDROOM_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Keep the session in memory only.
    #[arg(long, conflicts_with = "session_file")]
    pub ephemeral: bool,

    /// Start sessions with the bare facility directory, without demo stock
    /// or bookings.
    #[arg(long)]
    pub no_seed: bool,
}

impl Cli {
    pub fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment_delay_ms)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_secs(self.settle_interval_secs.max(1))
    }

    pub fn session_store(&self) -> Box<dyn SessionStore + Send> {
        if self.ephemeral {
            return Box::new(MemoryStore::new());
        }
        let path = self
            .session_file
            .clone()
            .unwrap_or_else(FileStore::default_path);
        Box::new(FileStore::new(path))
    }
}
