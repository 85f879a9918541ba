// In-process stand-in for the portal, used by the session and poll loop tests.

use std::collections::VecDeque;
use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};
use crate::settings::{GRADES_PATH, LOGIN_PATH};

pub const TOKEN: &str = "tok-123";

pub struct PortalState {
    pub login_status: u16,
    pub token: Option<String>,
    pub login_gets: usize,
    pub login_posts: Vec<String>,
    pub grade_gets: usize,
    pub user_agents: Vec<String>,
    grade_replies: VecDeque<(u16, String)>,
}

pub struct Portal {
    pub addr: SocketAddr,
    pub base_url: String,
    state: Arc<Mutex<PortalState>>,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Portal {
    pub fn start() -> Portal {
        Self::start_on("127.0.0.1:0".parse().unwrap())
    }

    pub fn start_on(addr: SocketAddr) -> Portal {
        let server = Server::http(addr).expect("start tiny_http server");
        let addr = server.server_addr().to_ip().expect("tcp listener");
        let base_url = format!("http://{}", addr);
        let state = Arc::new(Mutex::new(PortalState {
            login_status: 200,
            token: Some(TOKEN.to_string()),
            login_gets: 0,
            login_posts: Vec::new(),
            grade_gets: 0,
            user_agents: Vec::new(),
            grade_replies: VecDeque::new(),
        }));
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();

        let shared = Arc::clone(&state);
        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let mut request = match server.recv_timeout(Duration::from_millis(20)) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(_) => break,
            };

            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let path = request.url().split('?').next().unwrap_or("").to_string();
            let is_post = *request.method() == tiny_http::Method::Post;

            let (status, reply, set_cookie) = {
                let mut state = shared.lock().unwrap();
                if let Some(agent) = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("User-Agent"))
                {
                    state.user_agents.push(agent.value.as_str().to_string());
                }
                match (path.as_str(), is_post) {
                    (LOGIN_PATH, false) => {
                        state.login_gets += 1;
                        (state.login_status, login_page(state.token.as_deref()), false)
                    }
                    (LOGIN_PATH, true) => {
                        state.login_posts.push(body);
                        (200, "<html>Welcome</html>".to_string(), true)
                    }
                    (GRADES_PATH, false) => {
                        state.grade_gets += 1;
                        state
                            .grade_replies
                            .pop_front()
                            .map(|(status, body)| (status, body, false))
                            .unwrap_or_else(|| (200, grades_page(&[]), false))
                    }
                    _ => (404, "not found".to_string(), false),
                }
            };

            let mut response = Response::from_string(reply).with_status_code(status);
            if set_cookie {
                response.add_header(
                    Header::from_bytes(&b"Set-Cookie"[..], &b"auth=session-1; Path=/"[..]).unwrap(),
                );
            }
            let _ = request.respond(response);
        });

        Portal {
            addr,
            base_url,
            state,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, PortalState> {
        self.state.lock().unwrap()
    }

    pub fn queue_grades(&self, status: u16, body: String) {
        self.state().grade_replies.push_back((status, body));
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// An address nothing listens on, for connection failures.
pub fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn login_page(token: Option<&str>) -> String {
    let input = token
        .map(|t| format!(r#"<input name="__RequestVerificationToken" type="hidden" value="{}" />"#, t))
        .unwrap_or_default();
    format!(
        r#"<html><body><form method="post">{}<input name="Username" /><input name="Password" type="password" /></form></body></html>"#,
        input
    )
}

// Renders `(course, type, assessment)` triples as grade rows.
pub fn grades_page(rows: &[(&str, &str, &str)]) -> String {
    let rows: String = rows
        .iter()
        .map(|(course, kind, assessment)| {
            format!(
                r#"<tr class="lastGradeRow"><td><span class="badge">N</span></td><td>{}</td><td>{}</td><td>Lecturer</td><td>{}
                2024-05-01</td></tr>"#,
                course, kind, assessment
            )
        })
        .collect();
    format!("<html><body><table><tbody>{}</tbody></table></body></html>", rows)
}
