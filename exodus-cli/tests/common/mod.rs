//! Scripted loopback HTTP server for driving the `exodus` binary.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use tempfile::TempDir;

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Answers one connection per scripted `(status, body)` pair, in order.
pub struct FakeServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeServer {
    pub fn start(script: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        thread::spawn(move || {
            for (status, body) in script {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let recorded = read_request(&stream);
                seen.lock().expect("lock").push(recorded);
                write_response(stream, status, &body);
            }
        });

        Self { url, requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().expect("lock").clone()
    }
}

fn read_request(stream: &TcpStream) -> Recorded {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).expect("request line");
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).expect("header");
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().expect("content-length");
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).expect("body");
    Recorded {
        method,
        path,
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

fn write_response(mut stream: TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).expect("write");
    stream.flush().expect("flush");
}

pub fn task_json(id: &str, state: &str) -> String {
    format!(
        r#"{{"id":"{id}","publish_id":null,"state":"{state}","updated":"2024-05-01T12:00:00","deadline":null,"links":{{"self":"/task/{id}"}}}}"#
    )
}

pub fn publish_json(id: &str) -> String {
    format!(
        r#"{{"id":"{id}","env":"live","state":"PENDING","links":{{"self":"/live/publish/{id}","commit":"/live/publish/{id}/commit"}},"items":[]}}"#
    )
}

/// An `exodus` command with an isolated, config-free home directory.
pub fn exodus(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("exodus").expect("binary");
    cmd.env("HOME", home.path())
        .env("USER", "nobody")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}
