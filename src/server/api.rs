//! REST API implementation using rouille.
//!
//! # Key types
//!
//! - [`ApiServer`] - binds the HTTP server and runs it on a background thread
//! - [`ServerHandle`] - stops the server
//! - [`ApiState`] - registry, latest-scan slot and scanner status shared with the scanner
//!
//! # Thread safety
//!
//! Handlers only read [`LatestScan`] and call [`Registry`] methods, which
//! do their own locking. Nothing here waits on the scan loop.
//! CORS headers are added to all responses for browser access.

use crate::core::latest::LatestScan;
use crate::core::registry::{Registry, RegistryError};
use crate::core::action::{ActionKind, TagAction};
use crate::core::scanner::{ScanState, ScanStatus};
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, mpsc};
use std::thread;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to start API server on {addr}: {message}")]
    Bind { addr: String, message: String },
}

/// State shared between handlers and the scanner
pub struct ApiState {
    pub registry: Arc<Registry>,
    pub latest: Arc<LatestScan>,
    pub scanner: ScanStatus,
}

/// Plain response: `{success, message}`
#[derive(Serialize)]
struct ApiResponse<'a> {
    success: bool,
    message: &'a str,
}

impl<'a> ApiResponse<'a> {
    fn ok(message: &'a str) -> Self {
        Self { success: true, message }
    }

    fn err(message: &'a str) -> Self {
        Self { success: false, message }
    }
}

/// `{success, message, ...descriptor}`
#[derive(Serialize)]
struct TagResponse<'a> {
    success: bool,
    message: &'a str,
    #[serde(flatten)]
    tag: &'a TagAction,
}

#[derive(Serialize)]
struct RegistryResponse<'a> {
    success: bool,
    message: &'a str,
    tags: Vec<TagAction>,
}

#[derive(Serialize)]
struct TagClassesResponse<'a> {
    success: bool,
    message: &'a str,
    tag_classes: Vec<&'static str>,
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    success: bool,
    message: &'a str,
    scanner: ScanState,
}

/// Registration fields, from a form body, JSON body or query string
#[derive(Debug, Default, Deserialize)]
struct RegisterForm {
    #[serde(rename = "tag-class")]
    tag_class: Option<String>,
    uid: Option<String>,
    alias: Option<String>,
    parameter: Option<String>,
}

impl RegisterForm {
    fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "tag-class" => &mut self.tag_class,
            "uid" => &mut self.uid,
            "alias" => &mut self.alias,
            "parameter" => &mut self.parameter,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn fill_from_query(&mut self, request: &Request) {
        for name in ["tag-class", "uid", "alias", "parameter"] {
            if let Some(value) = request.get_param(name) {
                self.set(name, value);
            }
        }
    }
}

/// Running HTTP server
pub struct ServerHandle {
    addr: SocketAddr,
    stop_tx: mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting requests and wait for the server thread.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.thread.join().is_err() {
            log::error!("API server thread panicked");
        }
        log::info!("API server stopped");
    }
}

/// REST API server
pub struct ApiServer;

impl ApiServer {
    /// Bind `addr` and serve requests on a background thread.
    pub fn start(addr: &str, state: Arc<ApiState>) -> Result<ServerHandle, ApiError> {
        let server = rouille::Server::new(addr, move |request| {
            Self::handle_request(request, &state)
        })
        .map_err(|e| ApiError::Bind {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;

        let local = server.server_addr();
        log::info!("API server listening on http://{}", local);

        let (thread, stop_tx) = server.stoppable();
        Ok(ServerHandle {
            addr: local,
            stop_tx,
            thread,
        })
    }

    pub(crate) fn handle_request(request: &Request, state: &ApiState) -> Response {
        log::debug!("{} {}", request.method(), request.raw_url());

        if request.method() == "OPTIONS" {
            return Response::empty_204()
                .with_additional_header("Access-Control-Allow-Origin", "*")
                .with_additional_header("Access-Control-Allow-Methods", "GET, POST, PUT, OPTIONS")
                .with_additional_header("Access-Control-Allow-Headers", "Content-Type");
        }

        let response = rouille::router!(request,
            (GET) ["/api/latest"] => {
                Self::get_latest(state)
            },
            (GET) ["/api/registry"] => {
                Self::get_registry(state)
            },
            (POST) ["/api/register"] => {
                Self::register(request, state)
            },
            // Same full upsert as POST
            (PUT) ["/api/register"] => {
                Self::register(request, state)
            },
            (GET) ["/api/tag-classes"] => {
                Self::get_tag_classes()
            },
            (GET) ["/api/health"] => {
                Response::json(&HealthResponse {
                    success: true,
                    message: "tapdeck API server",
                    scanner: state.scanner.get(),
                })
            },
            _ => {
                Response::json(&ApiResponse::err("Not found")).with_status_code(404)
            }
        );

        response.with_additional_header("Access-Control-Allow-Origin", "*")
    }

    fn get_latest(state: &ApiState) -> Response {
        let latest = state.latest.get();
        log::debug!("Returning latest tag {:?}", latest.as_ref().map(|t| &t.uid));

        match latest {
            Some(tag) => Response::json(&TagResponse {
                success: true,
                message: "Scanned tag found",
                tag: &tag,
            }),
            None => Response::json(&ApiResponse::err("No tag scanned yet")),
        }
    }

    fn get_registry(state: &ApiState) -> Response {
        Response::json(&RegistryResponse {
            success: true,
            message: "Registry successfully read",
            tags: state.registry.list(),
        })
    }

    fn get_tag_classes() -> Response {
        Response::json(&TagClassesResponse {
            success: true,
            message: "Tag classes successfully retrieved",
            tag_classes: ActionKind::REGISTRABLE.iter().map(|k| k.name()).collect(),
        })
    }

    fn register(request: &Request, state: &ApiState) -> Response {
        let form = match Self::read_register_form(request) {
            Ok(form) => form,
            Err(message) => {
                return Response::json(&ApiResponse::err(&message)).with_status_code(400);
            }
        };

        let (Some(tag_class), Some(uid)) = (form.tag_class.as_deref(), form.uid.as_deref()) else {
            let missing = if form.tag_class.is_none() { "tag-class" } else { "uid" };
            let message = format!("Missing argument {}", missing);
            return Response::json(&ApiResponse::err(&message)).with_status_code(400);
        };

        match state.registry.register(
            tag_class,
            uid,
            form.alias.as_deref(),
            form.parameter.as_deref(),
        ) {
            Ok(tag) => Response::json(&TagResponse {
                success: true,
                message: "Tag successfully registered",
                tag: &tag,
            }),
            Err(RegistryError::InvalidArgument(message)) => {
                log::info!("Rejected registration: {}", message);
                Response::json(&ApiResponse::err(&message)).with_status_code(400)
            }
            Err(e) => {
                let message = e.to_string();
                Response::json(&ApiResponse::err(&message)).with_status_code(500)
            }
        }
    }

    fn read_register_form(request: &Request) -> Result<RegisterForm, String> {
        let content_type = request
            .header("Content-Type")
            .unwrap_or("")
            .to_ascii_lowercase();

        let mut form = if content_type.starts_with("application/json") {
            rouille::input::json_input::<RegisterForm>(request)
                .map_err(|e| format!("Invalid JSON: {}", e))?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let fields = rouille::input::post::raw_urlencoded_post_input(request)
                .map_err(|e| format!("Invalid form data: {}", e))?;
            let mut form = RegisterForm::default();
            for (name, value) in fields {
                form.set(&name, value);
            }
            form
        } else {
            RegisterForm::default()
        };

        form.fill_from_query(request);
        Ok(form)
    }
}
