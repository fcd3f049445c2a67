/// WebSocket actor: one connection, one dashboard session
use actix::prelude::*;
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::DashboardContext;
use crate::messages::ServerMessage;
use crate::session::DashboardSession;

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket connection actor. The actor's mailbox serializes the session's
/// events, so each recomputation finishes before the next one starts.
pub struct DashboardSocket {
    hb: Instant,
    session: DashboardSession,
}

impl DashboardSocket {
    pub fn new(ctx: Arc<DashboardContext>) -> Self {
        Self {
            hb: Instant::now(),
            session: DashboardSession::new(ctx),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                log::info!("WebSocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send_all(messages: Vec<ServerMessage>, ctx: &mut ws::WebsocketContext<Self>) {
        for msg in messages {
            match serde_json::to_string(&msg) {
                Ok(text) => ctx.text(text),
                Err(e) => log::error!("Failed to serialize server message: {}", e),
            }
        }
    }
}

impl Actor for DashboardSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        log::debug!("Dashboard session opened");
        self.hb(ctx);
        let messages = self.session.open();
        Self::send_all(messages, ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        log::debug!("Dashboard session closed");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for DashboardSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                let messages = self.session.handle_text(&text);
                Self::send_all(messages, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                log::warn!("Unexpected binary message");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}
