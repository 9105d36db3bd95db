use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use cspnet::config::{ServerConfig, set_config};
use cspnet::net::server::Server;

fn send(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

#[test]
fn serves_pages_with_policy_and_nonce() {
    let site = tempfile::tempdir().unwrap();
    std::fs::write(
        site.path().join("index.html"),
        "<html><script>boot()</script></html>",
    )
    .unwrap();

    set_config(ServerConfig {
        port: 0,
        static_files_root: site.path().to_str().unwrap().to_string(),
        ..ServerConfig::default()
    })
    .unwrap();

    let server = async_std::task::block_on(Server::bind()).unwrap();
    let addr = server.local_addr().unwrap();
    async_std::task::spawn(async move { server.run().await });

    let response = send(addr, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");

    let policy = response
        .lines()
        .find_map(|l| l.strip_prefix("Content-Security-Policy: "))
        .unwrap();
    let start = policy.find("'nonce-").unwrap() + "'nonce-".len();
    let nonce = &policy[start..start + 32];
    assert!(response.ends_with(&format!("<html><script nonce=\"{nonce}\">boot()</script></html>")));

    let response = send(addr, "GET / HTTP/9.9\r\nHost: localhost\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 505 HTTP Version Not Supported\r\n"), "{response}");

    let response = send(addr, "DELETE / HTTP/1.1\r\nHost: localhost\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"), "{response}");
}
