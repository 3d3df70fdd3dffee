// tests/common/mod.rs

use std::{
    io::{BufRead, BufReader, Write},
    net::TcpListener,
    sync::mpsc::{self, Receiver},
    thread::{self, JoinHandle},
};

/// A throwaway HTTP responder on 127.0.0.1 that answers `times` requests
/// with the same status and body, recording each request line.
pub struct StubService {
    pub api_address: String,
    requests: Receiver<String>,
    _handle: JoinHandle<()>,
}

impl StubService {
    pub fn serve(status: u16, body: &str, times: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        let (tx, rx) = mpsc::channel();
        let body = body.to_string();

        let handle = thread::spawn(move || {
            for _ in 0..times {
                let (mut stream, _) = match listener.accept() {
                    Ok(conn) => conn,
                    Err(_) => return,
                };

                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut request_line = String::new();
                let _ = reader.read_line(&mut request_line);
                // drain headers; the client sends no body on GET
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) => break,
                        Ok(_) if line == "\r\n" || line == "\n" => break,
                        Ok(_) => continue,
                        Err(_) => break,
                    }
                }

                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = tx.send(request_line.trim_end().to_string());
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self {
            api_address: format!("http://{}/v6/latest/", addr),
            requests: rx,
            _handle: handle,
        }
    }

    /// Request lines seen so far, e.g. `GET /v6/latest/EUR HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.try_iter().collect()
    }
}

pub const EUR_RATES: &str = r#"{
    "result": "success",
    "provider": "https://www.exchangerate-api.com",
    "time_last_update_utc": "Mon, 19 Oct 2026 00:02:31 +0000",
    "base_code": "EUR",
    "rates": {"EUR": 1, "USD": 1.1, "GBP": 0.86, "JPY": 161.5}
}"#;
