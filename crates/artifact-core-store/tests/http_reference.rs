use artifact_core::RemoteFetchError;
use artifact_core_store::{HttpReferenceSource, ReferenceSource};
use pretty_assertions::assert_eq;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

/// Serve one canned HTTP response on a local port and return the base URL plus the request line.
fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" || header.is_empty() {
                break;
            }
        }
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        request_line.trim_end().to_string()
    });
    (base_url, handle)
}

#[test]
fn test_fetch_returns_body() {
    let (base_url, server) = serve_once("200 OK", "a=remote");
    let source = HttpReferenceSource::with_timeout(format!("{base_url}/refs/"), Duration::from_secs(5));

    assert_eq!(source.fetch("/site/app.js"), Ok("a=remote".to_string()));
    assert_eq!(server.join().unwrap(), "GET /refs/site/app.js HTTP/1.1");
}

#[test]
fn test_404_is_not_found() {
    let (base_url, server) = serve_once("404 Not Found", "");
    let source = HttpReferenceSource::with_timeout(base_url, Duration::from_secs(5));

    assert_eq!(
        source.fetch("missing.js"),
        Err(RemoteFetchError::NotFound("missing.js".to_string()))
    );
    server.join().unwrap();
}

#[test]
fn test_server_error_is_network_failure() {
    let (base_url, server) = serve_once("503 Service Unavailable", "busy");
    let source = HttpReferenceSource::with_timeout(base_url, Duration::from_secs(5));

    assert!(matches!(
        source.fetch("a.js"),
        Err(RemoteFetchError::Network(message)) if message.contains("503")
    ));
    server.join().unwrap();
}

#[test]
fn test_unreachable_host_is_network_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let source =
        HttpReferenceSource::with_timeout(format!("http://127.0.0.1:{port}"), Duration::from_secs(2));

    assert!(matches!(
        source.fetch("a.js"),
        Err(RemoteFetchError::Network(_))
    ));
}
