//! Core HTTP server implementation.
//!
//! This module implements the low-level HTTP server runtime.
//! It is responsible only for networking concerns such as:
//! - accepting TCP connections,
//! - reading raw bytes from the network,
//! - writing raw bytes back to the client.
//!
//! Request parsing, validation and response generation live in the `http`
//! and `handler` modules. Every response to a parsed request carries a
//! `Content-Security-Policy` built for that request.
//!
//! The server uses `async-std` for non-blocking I/O, one task per client.
//! Connections serve a single request and are closed afterwards.
//!
//! ## Request handling flow
//!
//! 1. Accept a TCP connection
//! 2. Read raw data from the stream
//! 3. Incrementally parse the data into an [`HttpRequest`]
//!    (delegated to [`http::parser::Parser`](crate::http::parser::Parser))
//! 4. Validate the request once its headers are known
//!    (delegated to [`http::validator::Validator`](crate::http::validator::Validator))
//! 5. Generate an [`HttpResponse`]
//!    (delegated to [`handler::handle_request`](crate::handler::handle_request))
//! 6. Serialize and write the response back to the client

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::config;
use crate::handler;
use crate::http::parser::*;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::http::validator::{Validator, ValidatorError};
use async_std::io;
use async_std::net::{TcpListener, TcpStream};
use async_std::prelude::*;
use async_std::task;

const EMFILE: i32 = 24;
const ENFILE: i32 = 23;

/// Pause before accepting again. Out of file descriptors, retrying at once
/// would spin until a connection closes.
fn accept_backoff(err: &std::io::Error) -> Option<Duration> {
    match err.raw_os_error() {
        Some(EMFILE) | Some(ENFILE) => Some(Duration::from_millis(100)),
        _ => None,
    }
}

pub struct Server {
    listener: TcpListener,
}

/// Errors that can occur while reading and parsing an HTTP request from the stream
/// used to interrupt the flow and return appropriate responses.
enum ReadError {
    Io(std::io::Error),
    ConnectionClosed,
    Parser(ParserError),
    Validator(ValidatorError),
}

impl Server {
    /// Binds the configured address and port.
    pub async fn bind() -> std::io::Result<Self> {
        let listener = TcpListener::bind((config().address, config().port)).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, spawning a task per client.
    ///
    /// A failed accept only costs that connection.
    pub async fn run(&self) -> std::io::Result<()> {
        tracing::info!(addr = %self.local_addr()?, "listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    if let Some(pause) = accept_backoff(&err) {
                        task::sleep(pause).await;
                    }
                    continue;
                }
            };
            task::spawn(async move {
                if let Err(err) = Self::handle_client(stream).await {
                    tracing::warn!(%peer, error = %err, "connection error");
                }
            });
        }
    }

    /// Reads and incrementally parses an HTTP request from the TCP stream.
    ///
    /// The request is validated as soon as its headers are parsed, before
    /// any body is read.
    async fn read_request(stream: &mut TcpStream) -> Result<HttpRequest, ReadError> {
        let mut parser = Parser::new();
        let mut req = HttpRequest::new();
        let mut buffer = vec![0; config().buffer_size];

        loop {
            let n = match io::timeout(config().read_timeout, stream.read(&mut buffer)).await {
                Ok(0) => return Err(ReadError::ConnectionClosed),
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReadError::Io(e)),
            };

            let mut data = &buffer[..n];
            loop {
                match parser.feed(data, &mut req).map_err(ReadError::Parser)? {
                    ParserOk::Incomplete => break,
                    ParserOk::HeadersDone => {
                        Validator::validate_request(&req).map_err(ReadError::Validator)?;
                        // resume on what is already buffered
                        data = &[];
                    }
                    ParserOk::Done => return Ok(req),
                }
            }
        }
    }

    /// Writes the given `HttpResponse` back to the TCP stream.
    async fn write_response(stream: &mut TcpStream, response: &HttpResponse) -> std::io::Result<()> {
        let write = async {
            stream.write_all(response.build_headers().as_bytes()).await?;
            stream.write_all(&response.body).await?;
            stream.flush().await
        };
        io::timeout(config().write_timeout, write).await
    }

    /// Handles a single client connection.
    async fn handle_client(mut stream: TcpStream) -> std::io::Result<()> {
        let response = match Self::read_request(&mut stream).await {
            Ok(req) => handler::handle_request(&req),
            Err(ReadError::Io(err)) => {
                tracing::debug!(error = %err, "I/O error while reading request");
                return Ok(());
            }
            Err(ReadError::ConnectionClosed) => return Ok(()),
            Err(ReadError::Parser(err)) => {
                tracing::debug!(?err, "unparsable request");
                handler::handle_error(err.into_http_status())
            }
            Err(ReadError::Validator(err)) => {
                tracing::debug!(?err, "invalid request");
                handler::handle_error(err.into_http_status())
            }
        };

        Self::write_response(&mut stream, &response).await
    }
}
