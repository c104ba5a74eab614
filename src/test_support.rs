//! Loopback peer that answers requests with scripted replies.

use crate::client::read_reply;
use boincrpc_proto::{reply, SENTINEL};
use std::io::Write;
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// Wrap a reply body in the reply envelope.
pub fn envelope(body: &str) -> String {
    format!("{}\n{}{}\n", reply::OPEN, body, reply::CLOSE)
}

pub struct MockPeer {
    pub port: u16,
    handle: JoinHandle<Vec<String>>,
}

impl MockPeer {
    /// Accept one connection and answer successive requests with `replies`.
    pub fn spawn(replies: Vec<String>) -> Self {
        let count = replies.len();
        let mut replies = replies.into_iter();
        Self::spawn_with(count, move |_| replies.next().unwrap_or_default())
    }

    /// Accept one connection and answer up to `count` requests with
    /// `handler(request)`. The sentinel is appended to each reply.
    pub fn spawn_with<F>(count: usize, mut handler: F) -> Self
    where
        F: FnMut(&str) -> String + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            let Ok((mut stream, _)) = listener.accept() else {
                return requests;
            };
            for _ in 0..count {
                let Ok(request) = read_reply(&mut stream) else {
                    break;
                };
                let request = String::from_utf8_lossy(&request).into_owned();
                let answer = handler(&request);
                requests.push(request);
                if stream.write_all(answer.as_bytes()).is_err()
                    || stream.write_all(&[SENTINEL]).is_err()
                {
                    break;
                }
            }
            requests
        });
        Self { port, handle }
    }

    /// Wait for the peer to finish and return the requests it received,
    /// without their sentinels.
    pub fn requests(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}
