//! Back-link to the editor: tells it which line was clicked in the preview.

use std::io;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Preview anchors are 0-based; editors count from 1.
pub fn editor_line(anchor_line: usize) -> usize {
    anchor_line + 1
}

/// Send `{"line": N}\n` to the editor listening at `addr`.
pub async fn notify_line(addr: &str, line: usize) -> io::Result<()> {
    let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "editor did not accept connection"))??;
    let mut message = serde_json::json!({ "line": line }).to_string();
    message.push('\n');
    stream.write_all(message.as_bytes()).await?;
    stream.shutdown().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn sends_one_json_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let reader = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            tokio::io::BufReader::new(socket)
                .read_line(&mut line)
                .await
                .unwrap();
            line
        });

        notify_line(&addr, editor_line(41)).await.unwrap();
        assert_eq!(reader.await.unwrap(), "{\"line\":42}\n");
    }

    #[tokio::test]
    async fn unreachable_editor_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(notify_line(&addr, 1).await.is_err());
    }
}
