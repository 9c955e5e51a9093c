//! Outbound line queue shared by the event loop, handlers, and the
//! NickServ challenge.

use crate::error::ConnectionError;
use crate::proto::IrcLine;
use std::time::Duration;
use tokio::sync::mpsc;

/// Timeout for a full queue before the send is abandoned.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloneable handle onto a connection's writer task.
#[derive(Clone, Debug)]
pub struct Outbound {
    tx: mpsc::Sender<IrcLine>,
}

impl Outbound {
    pub fn new(tx: mpsc::Sender<IrcLine>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, line: IrcLine) -> Result<(), ConnectionError> {
        match tokio::time::timeout(SEND_TIMEOUT, self.tx.send(line)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ConnectionError::Closed),
            Err(_timeout) => {
                tracing::warn!("Outbound queue stalled (timeout after {:?})", SEND_TIMEOUT);
                Err(ConnectionError::Closed)
            }
        }
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<(), ConnectionError> {
        self.send(IrcLine::privmsg(target, text)?).await
    }

    pub async fn notice(&self, target: &str, text: &str) -> Result<(), ConnectionError> {
        self.send(IrcLine::notice(target, text)?).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    #[tokio::test]
    async fn queues_lines_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let outbound = Outbound::new(tx);
        outbound.privmsg("#c", "one").await.unwrap();
        outbound.notice("bob", "two").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().to_string(), "PRIVMSG #c :one");
        assert_eq!(rx.recv().await.unwrap().to_string(), "NOTICE bob :two");
    }

    #[tokio::test]
    async fn bad_target_is_refused_before_queueing() {
        let (tx, mut rx) = mpsc::channel(4);
        let outbound = Outbound::new(tx);
        assert!(matches!(
            outbound.privmsg("#x\rQUIT :pwned", "hi").await,
            Err(ConnectionError::Protocol(ProtocolError::InvalidTarget(_)))
        ));
        assert!(outbound.notice("a b", "hi").await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let outbound = Outbound::new(tx);
        assert!(outbound.is_closed());
        assert!(matches!(
            outbound.privmsg("#c", "x").await,
            Err(ConnectionError::Closed)
        ));
    }
}
