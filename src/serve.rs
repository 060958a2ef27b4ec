//! Local web server hosting the dashboard page
//!
//! Requests are served one at a time from the accept loop, so every UI event
//! reaches the `Dashboard` in order and is fully handled before the next one.

use crate::chart::derive_chart;
use crate::controller::{ChartUpdate, Dashboard, DashboardEvent};
use crate::error::DashboardError;
use crate::selection::SelectionState;
use crate::statistic::Statistic;
use crate::table::TableView;
use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tiny_http::{Header, Method, Response, Server};

const DASHBOARD_HTML: &str = include_str!("../assets/dashboard.html");

/// Presentation settings for the hosted page
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub address: String,
    pub open_browser: bool,
    pub background: String,
    pub text: String,
    pub chart_height: u32,
}

/// Response produced by the router, independent of the transport
#[derive(Debug, Clone, PartialEq)]
struct Reply {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Reply {
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status: 200,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::error(500, &format!("Failed to serialise response: {}", e)),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: json!({ "error": message }).to_string(),
        }
    }

    fn rejected(err: &DashboardError) -> Self {
        Self::error(400, &err.to_string())
    }
}

/// Start the web server and serve until the process is interrupted
pub fn start_server(mut dashboard: Dashboard, options: &ServeOptions) -> Result<()> {
    let server = Server::http(&options.address)
        .map_err(|e| anyhow::anyhow!("Failed to start server on {}: {}", options.address, e))?;

    let url = format!("http://{}/", options.address);
    info!("Dashboard running at {}", url);
    info!("Press Ctrl+C to stop");

    if options.open_browser {
        if let Err(e) = webbrowser::open(&url) {
            warn!("Could not open browser: {}. Please open {} manually.", e, url);
        }
    }

    let page = render_page(options);

    for mut request in server.incoming_requests() {
        let url = request.url().to_string();
        let method = request.method().clone();

        let mut body = String::new();
        if method == Method::Post {
            if let Err(e) = request.as_reader().read_to_string(&mut body) {
                warn!("Failed to read request body for {}: {}", url, e);
            }
        }

        debug!("{} {}", method, url);
        let reply = if method == Method::Get && (url == "/" || url == "/index.html") {
            Reply {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: page.clone(),
            }
        } else {
            route(&mut dashboard, options, &method, &url, &body)
        };

        let response = Response::from_string(reply.body)
            .with_status_code(reply.status)
            .with_header(Header::from_bytes("Content-Type", reply.content_type).unwrap());

        if let Err(e) = request.respond(response) {
            error!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

fn render_page(options: &ServeOptions) -> String {
    DASHBOARD_HTML
        .replace("{{BACKGROUND}}", &options.background)
        .replace("{{TEXT}}", &options.text)
        .replace("{{CHART_HEIGHT}}", &options.chart_height.to_string())
}

fn route(dashboard: &mut Dashboard, options: &ServeOptions, method: &Method, url: &str, body: &str) -> Reply {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (Method::Get, "/api/state") => {
            let state = dashboard.state();
            let figure = state
                .chart
                .as_ref()
                .map(|c| c.to_figure(&options.background, options.chart_height));
            Reply::json(&json!({ "state": state, "figure": figure }))
        }
        (Method::Get, "/api/columns") => Reply::json(&TableView::column_specs(dashboard.dataset())),
        (Method::Get, "/api/chart") => chart_query(dashboard, options, url),
        (Method::Post, "/api/event") => {
            let event: DashboardEvent = match serde_json::from_str(body) {
                Ok(event) => event,
                Err(e) => return Reply::error(400, &format!("Malformed event: {}", e)),
            };
            match dashboard.handle(event) {
                Ok(update) => {
                    let figure = match &update.chart {
                        ChartUpdate::Redraw(chart) => {
                            Some(chart.to_figure(&options.background, options.chart_height))
                        }
                        _ => None,
                    };
                    Reply::json(&json!({ "update": update, "figure": figure }))
                }
                Err(e) => {
                    warn!("Rejected event: {}", e);
                    Reply::rejected(&e)
                }
            }
        }
        _ => Reply {
            status: 404,
            content_type: "text/plain",
            body: "Not found".to_string(),
        },
    }
}

/// Stateless derivation: `/api/chart?ids=0,2&statistic=Mean`
fn chart_query(dashboard: &Dashboard, options: &ServeOptions, url: &str) -> Reply {
    let params = parse_query_params(url);

    let statistic = match params.get("statistic") {
        Some(s) => match s.parse::<Statistic>() {
            Ok(stat) => stat,
            Err(e) => return Reply::rejected(&e),
        },
        None => dashboard.statistic(),
    };

    let ids: Result<SelectionState, _> = params
        .get("ids")
        .map(|s| s.as_str())
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<usize>())
        .collect();
    let Ok(selection) = ids else {
        return Reply::error(400, "ids must be a comma-separated list of row ids");
    };

    let derivation = derive_chart(dashboard.dataset(), &selection, statistic);
    let figure = derivation
        .chart
        .as_ref()
        .map(|c| c.to_figure(&options.background, options.chart_height));
    let notices: Vec<String> = derivation.notices.iter().map(|n| n.to_string()).collect();
    Reply::json(&json!({ "chart": derivation.chart, "figure": figure, "notices": notices }))
}

/// Parse query parameters from URL path
fn parse_query_params(path: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(query) = path.split('?').nth(1) {
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                // Simple URL decoding for common cases
                let decoded = value
                    .replace("%20", " ")
                    .replace("%2C", ",")
                    .replace("%2c", ",")
                    .replace('+', " ");
                params.insert(key.to_string(), decoded);
            }
        }
    }
    params
}
