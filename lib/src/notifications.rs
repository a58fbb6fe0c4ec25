// lib/src/notifications.rs

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use models::{AppointmentRecord, ClinicError};

pub const APPOINTMENTS_CREATED: &str = "appointments:created";
pub const DASHBOARD_UPDATED: &str = "dashboard:updated";

/// Events kept per channel for slow subscribers before they start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Appointments,
    Dashboard,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Appointments => "appointments",
            Channel::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "appointments" => Ok(Channel::Appointments),
            "dashboard" => Ok(Channel::Dashboard),
            other => Err(ClinicError::Validation(format!("Unknown channel '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeEvent {
    pub channel: Channel,
    pub name: String,
    pub payload: Value,
}

impl RealtimeEvent {
    pub fn new(channel: Channel, name: impl Into<String>, payload: Value) -> Self {
        RealtimeEvent { channel, name: name.into(), payload }
    }

    /// The pair published after a booking commits: the appointment itself on
    /// `appointments`, and a dashboard refresh hint on `dashboard`.
    pub fn for_booking(record: &AppointmentRecord) -> Result<[RealtimeEvent; 2], serde_json::Error> {
        let appointment = serde_json::to_value(record)?;
        Ok([
            RealtimeEvent::new(Channel::Appointments, APPOINTMENTS_CREATED, appointment.clone()),
            RealtimeEvent::new(
                Channel::Dashboard,
                DASHBOARD_UPDATED,
                json!({ "type": "appointments", "appointment": appointment }),
            ),
        ])
    }
}

/// Outbound event sink. Delivery is at-most-once and `publish` never fails
/// or blocks the caller.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn publish(&self, event: RealtimeEvent);
}

/// In-process publish/subscribe hub. Published events go onto an unbounded
/// queue; a background task fans them out to per-channel broadcast senders.
pub struct NotificationHub {
    queue: mpsc::UnboundedSender<RealtimeEvent>,
    appointments: broadcast::Sender<RealtimeEvent>,
    dashboard: broadcast::Sender<RealtimeEvent>,
}

impl NotificationHub {
    /// Spawns the dispatch task; must be called inside a Tokio runtime.
    pub fn start(capacity: usize) -> Arc<Self> {
        let (queue, mut rx) = mpsc::unbounded_channel::<RealtimeEvent>();
        let (appointments, _) = broadcast::channel(capacity);
        let (dashboard, _) = broadcast::channel(capacity);

        let hub = Arc::new(NotificationHub { queue, appointments, dashboard });

        let appointments_tx = hub.appointments.clone();
        let dashboard_tx = hub.dashboard.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let sender = match event.channel {
                    Channel::Appointments => &appointments_tx,
                    Channel::Dashboard => &dashboard_tx,
                };
                let channel = event.channel;
                match sender.send(event) {
                    Ok(receivers) => debug!("Dispatched event on {} to {} subscribers", channel, receivers),
                    Err(_) => debug!("No subscribers on {}, event dropped", channel),
                }
            }
            debug!("Notification dispatcher stopped");
        });

        hub
    }

    pub fn subscribe(&self, channel: Channel) -> broadcast::Receiver<RealtimeEvent> {
        match channel {
            Channel::Appointments => self.appointments.subscribe(),
            Channel::Dashboard => self.dashboard.subscribe(),
        }
    }
}

impl Notifier for NotificationHub {
    fn publish(&self, event: RealtimeEvent) {
        if let Err(e) = self.queue.send(event) {
            warn!("Notification dispatcher is gone, dropping event {}", e.0.name);
        }
    }
}
