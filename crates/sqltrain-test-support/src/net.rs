//! Local TCP endpoints standing in for network dependencies.

use std::net::TcpListener as StdTcpListener;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Port that was free a moment ago; nothing listens on it after return.
///
/// # Errors
///
/// Returns an error when no ephemeral port can be bound.
pub fn reserve_port() -> Result<u16> {
    let listener = StdTcpListener::bind("127.0.0.1:0").context("failed to reserve port")?;
    let port = listener
        .local_addr()
        .context("failed to read listener address")?
        .port();
    drop(listener);
    Ok(port)
}

/// Listener that starts accepting connections after a delay.
///
/// Accepted connections are closed immediately. The task is aborted on drop.
pub struct DelayedListener {
    port: u16,
    task: JoinHandle<()>,
}

impl DelayedListener {
    /// Port the listener binds once its delay has passed.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for DelayedListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start listening on a fresh local port after `delay`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error when no port can be reserved.
pub fn listen_after(delay: Duration) -> Result<DelayedListener> {
    let port = reserve_port()?;
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await else {
            return;
        };
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    Ok(DelayedListener { port, task })
}

/// Start listening on a fresh local port right away.
///
/// # Errors
///
/// Returns an error when the listener cannot be bound.
pub async fn listen_now() -> Result<DelayedListener> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind listener")?;
    let port = listener
        .local_addr()
        .context("failed to read listener address")?
        .port();
    let task = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });
    Ok(DelayedListener { port, task })
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpStream;

    use super::*;

    #[tokio::test]
    async fn reserved_port_is_closed() -> Result<()> {
        let port = reserve_port()?;
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn delayed_listener_opens_after_its_delay() -> Result<()> {
        let listener = listen_after(Duration::from_millis(150))?;
        assert!(TcpStream::connect(("127.0.0.1", listener.port())).await.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        TcpStream::connect(("127.0.0.1", listener.port())).await?;
        Ok(())
    }

    #[tokio::test]
    async fn immediate_listener_accepts() -> Result<()> {
        let listener = listen_now().await?;
        TcpStream::connect(("127.0.0.1", listener.port())).await?;
        Ok(())
    }
}
