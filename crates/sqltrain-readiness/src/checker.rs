//! Single-attempt connectivity checks.

use std::io;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::target::Target;

/// One readiness attempt against a target.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Succeeds when the target accepted the check.
    async fn check(&self, target: &Target) -> io::Result<()>;
}

/// Opens and immediately closes a TCP connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpChecker;

#[async_trait]
impl Checker for TcpChecker {
    async fn check(&self, target: &Target) -> io::Result<()> {
        let stream = TcpStream::connect((target.host.as_str(), target.port)).await?;
        drop(stream);
        Ok(())
    }
}
