use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use common::assignment::StudentIdentity;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use tracing::instrument;

use crate::entity::technician;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::live::session::SessionScope;
use crate::live::{Collection, Feed, Snapshot};
use crate::models::account::TechnicianResponse;
use crate::models::live::LiveEvent;
use crate::models::repair::RepairResponse;
use crate::state::AppState;

/// `None` ends the whole session stream.
type EventStream = BoxStream<'static, Option<Event>>;

fn to_event<T: Serialize>(name: &'static str, version: u64, items: &[T]) -> Event {
    match Event::default().event(name).json_data(LiveEvent { version, items }) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(feed = name, error = %e, "Failed to encode live snapshot");
            Event::default().comment("encode error")
        }
    }
}

fn feed_events<T>(feed: &Arc<Feed<T>>) -> EventStream
where
    T: Serialize + Send + Sync + 'static,
{
    let name = feed.name();
    feed.subscribe()
        .into_stream()
        .map(move |snap| Some(to_event(name, snap.version, &snap.items)))
        .boxed()
}

enum StudentUpdate {
    Repairs(Snapshot<RepairResponse>),
    Roster(Snapshot<TechnicianResponse>),
}

enum RosterChange {
    Unchanged,
    /// Re-filtered repairs, if a snapshot was already sent.
    Refreshed(Option<Event>),
    Removed,
}

struct StudentRepairs {
    updates: BoxStream<'static, StudentUpdate>,
    scope: SessionScope,
    technician_id: i32,
    latest: Option<Snapshot<RepairResponse>>,
    db: DatabaseConnection,
}

impl StudentRepairs {
    fn event(&self, snap: &Snapshot<RepairResponse>) -> Event {
        let visible = self.scope.filter_repairs(&snap.items);
        to_event(Collection::Repairs.as_str(), snap.version, &visible)
    }

    /// Follow the Student's own technician record.
    async fn apply_roster(&mut self, roster: &[TechnicianResponse]) -> RosterChange {
        let SessionScope::Student(me) = &mut self.scope else {
            return RosterChange::Unchanged;
        };
        match roster.iter().find(|t| t.id == self.technician_id) {
            Some(t) => {
                if me.name.as_deref() == Some(t.name.as_str()) && me.email == t.email {
                    return RosterChange::Unchanged;
                }
                me.name = Some(t.name.clone());
                me.email = t.email.clone();
                tracing::debug!(technician_id = t.id, "Live session identity refreshed");
                RosterChange::Refreshed(self.latest.as_ref().map(|snap| self.event(snap)))
            }
            // The roster may lag behind the account; only a confirmed delete ends the stream.
            None => match technician::Entity::find_by_id(self.technician_id)
                .one(&self.db)
                .await
            {
                Ok(None) => RosterChange::Removed,
                Ok(Some(_)) => RosterChange::Unchanged,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not check live session account");
                    RosterChange::Unchanged
                }
            },
        }
    }
}

/// Repairs visible to a Student, re-filtered whenever their technician
/// record is renamed or changes email.
fn student_repair_events(state: &AppState, scope: &SessionScope, technician_id: i32) -> EventStream {
    let repairs = state.live.repairs.subscribe().into_stream().map(StudentUpdate::Repairs);
    let roster = state
        .live
        .technicians
        .subscribe()
        .into_stream()
        .map(StudentUpdate::Roster);

    let session = StudentRepairs {
        updates: stream::select(repairs, roster).boxed(),
        scope: scope.clone(),
        technician_id,
        latest: None,
        db: state.db.clone(),
    };

    stream::unfold(session, |mut session| async move {
        loop {
            match session.updates.next().await? {
                StudentUpdate::Repairs(snap) => {
                    let event = session.event(&snap);
                    session.latest = Some(snap);
                    return Some((Some(event), session));
                }
                StudentUpdate::Roster(snap) => match session.apply_roster(&snap.items).await {
                    RosterChange::Refreshed(Some(event)) => return Some((Some(event), session)),
                    RosterChange::Refreshed(None) | RosterChange::Unchanged => {}
                    RosterChange::Removed => {
                        tracing::info!(
                            technician_id = session.technician_id,
                            "Live session closed: account removed"
                        );
                        return Some((None, session));
                    }
                },
            }
        }
    })
    .boxed()
}

fn collection_events(state: &AppState, scope: &SessionScope, collection: Collection) -> EventStream {
    let live = &state.live;
    match collection {
        Collection::Technicians => feed_events(&live.technicians),
        Collection::Customers => feed_events(&live.customers),
        Collection::Donations => feed_events(&live.donations),
        Collection::Admins => feed_events(&live.admins),
        Collection::Repairs => match scope {
            SessionScope::Student(StudentIdentity {
                technician_id: Some(id),
                ..
            }) => student_repair_events(state, scope, *id),
            _ => feed_events(&live.repairs),
        },
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Live",
    operation_id = "subscribeLive",
    summary = "Stream live collection snapshots",
    description = "Server-sent events. Each event is named after a collection (`technicians`, `repairs`, `customers`, `donations`, `admins`) and carries `{version, items}` with the full ordered snapshot. The current snapshot of every collection is sent on connect. Students receive technicians, customers and only the repairs visible to them. The token may be passed as `?access_token=` for clients that cannot set headers.",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Temporary password still active (PASSWORD_CHANGE_REQUIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(account_id = auth_user.account_id, role = %auth_user.role))]
pub async fn subscribe(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let scope = SessionScope::load(&state.db, &auth_user).await?;

    let streams: Vec<EventStream> = scope
        .collections()
        .iter()
        .map(|&collection| collection_events(&state, &scope, collection))
        .collect();

    tracing::info!(
        collections = streams.len(),
        subscribers = state.live.subscriber_count(),
        "Live session opened"
    );

    let events = stream::select_all(streams)
        .take_while(|event| future::ready(event.is_some()))
        .filter_map(|event| future::ready(event.map(Ok::<_, Infallible>)));

    let keep_alive = KeepAlive::new().interval(Duration::from_secs(state.config.live.keep_alive_secs));
    Ok(Sse::new(events).keep_alive(keep_alive))
}
