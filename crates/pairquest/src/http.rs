//! Plain HTTP endpoints served next to the WebSocket listener.
//!
//! - `GET /` : a short HTML page linking to the game client.
//! - `GET /health` : `{"message":"health check"}` for load balancers.
//!
//! `tiny_http` is blocking, so requests are served on a dedicated thread.

use std::io::Read;
use std::net::SocketAddr;
use std::thread;

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::PairQuestError;

#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
}

/// Handle to the running HTTP endpoints.
#[derive(Debug)]
pub struct HttpEndpoints {
    addr: SocketAddr,
}

impl HttpEndpoints {
    /// Binds `addr` and starts serving on a background thread.
    ///
    /// The thread lives until the process exits.
    pub fn start(addr: &str, app_url: &str) -> Result<Self, PairQuestError> {
        let server = Server::http(addr).map_err(|e| PairQuestError::Http(e.to_string()))?;
        let bound = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| PairQuestError::Http(format!("{addr} is not an ip address")))?;

        let index = index_page(app_url);
        thread::Builder::new()
            .name("pairquest-http".into())
            .spawn(move || {
                for request in server.incoming_requests() {
                    if let Err(e) = handle_request(request, &index) {
                        tracing::debug!(error = %e, "http request failed");
                    }
                }
            })?;

        tracing::info!(addr = %bound, "http endpoints listening");
        Ok(Self { addr: bound })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

fn handle_request(request: Request, index: &str) -> Result<(), PairQuestError> {
    let path = request.url().split('?').next().unwrap_or_default();
    let response = match (request.method(), path) {
        (&Method::Get, "/") => {
            with_content_type(Response::from_string(index), "text/html; charset=utf-8")
        }
        (&Method::Get, "/health") => {
            let body = serde_json::to_string(&HealthResponse {
                message: "health check",
            })
            .map_err(|e| PairQuestError::Http(e.to_string()))?;
            with_content_type(Response::from_string(body), "application/json")
        }
        _ => Response::from_string("Not Found").with_status_code(404),
    };
    request.respond(response)?;
    Ok(())
}

fn with_content_type<R: Read>(response: Response<R>, value: &str) -> Response<R> {
    match Header::from_bytes(&b"Content-Type"[..], value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn index_page(app_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Memory Server</title>
  </head>
  <body>
    <div>
      <h1>Memory Server</h1>
      <p>
        This is the server that powers the multiplayer mode of memory, a game
        where players try to match pairs.
      </p>
      <p>Play it <a href="{app_url}">here</a></p>
    </div>
  </body>
</html>
"#
    )
}
