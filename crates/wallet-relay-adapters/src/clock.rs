use wallet_relay_core::{ClockPort, PortError};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| PortError::Transport(format!("time error: {e}")))?;
        u64::try_from(now.as_millis())
            .map_err(|_| PortError::Transport("clock out of range".to_owned()))
    }
}
