//! engine::gesture
//!
//! Turns a continuous drag gesture into at most one [`MoveIntent`].
//!
//! # State Machine
//!
//! ```text
//!            press (pointer)              travel > activation distance
//!   Idle ─────────────────────► Idle+armed ─────────────────────────► Dragging
//!    ▲  ◄──── release (click) ───┘                                    │  │
//!    │                                                                │  │ Escape / cancel /
//!    │   pick up (keyboard) ─────────────────────────────────────────►│  │ focus loss
//!    │                                                                │  │
//!    │ ◄──────────────────────────────────────────────────────────────┼──┘
//!    │                                            release / drop key  ▼
//!    └────────────────── take_resolution() ◄──────────────────── Resolving
//! ```
//!
//! While dragging, every movement re-runs hit-testing: the dragged card's
//! rect (its origin rect shifted by the pointer delta) is compared against
//! every registered [`DropTarget`] and the closest colliding one by corner
//! distance becomes the hovered target. When a stage wins but one of its own
//! cards also collides, the card is preferred, so nested regions resolve to
//! the innermost candidate. Hovering is feedback only; nothing is mutated.
//!
//! On release the hovered target decides the destination: a card means "take
//! its index", a stage container means "append at end", and nothing hovered
//! means the gesture resolves to no intent.
//!
//! # Invariants
//!
//! 1. At most one intent is produced per session, and only via
//!    [`GestureResolver::take_resolution`].
//! 2. A pointer press that never travels past the activation distance never
//!    leaves `Idle`, so its release produces nothing.
//! 3. Cancelling during `Dragging` returns to `Idle` with no intent.
//! 4. The resolver never touches the network or the store.

use crate::core::snapshot::{MoveIntent, PipelineSnapshot};
use crate::core::types::{PaperId, StageId};

use super::geometry::{Point, Rect};

/// Thresholds for gesture activation.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Pointer travel (px) a press must exceed before it becomes a drag.
    pub activation_distance: f64,
    /// Distance (px) one arrow key moves a keyboard drag.
    pub keyboard_step: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            activation_distance: crate::core::config::DEFAULT_ACTIVATION_DISTANCE,
            keyboard_step: crate::core::config::DEFAULT_KEYBOARD_STEP,
        }
    }
}

impl GestureConfig {
    /// Take thresholds from loaded configuration.
    pub fn from_config(config: &crate::core::config::Config) -> Self {
        Self {
            activation_distance: config.activation_distance(),
            keyboard_step: config.keyboard_step(),
        }
    }
}

/// What a drop target stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTargetKind {
    /// A stage's droppable column area.
    Stage,
    /// A visible card inside a stage.
    Placement { paper_id: PaperId, index: usize },
}

/// A droppable region registered by the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub stage_id: StageId,
    pub kind: DropTargetKind,
    pub rect: Rect,
}

impl DropTarget {
    /// A stage column.
    pub fn stage(stage_id: StageId, rect: Rect) -> Self {
        Self {
            stage_id,
            kind: DropTargetKind::Stage,
            rect,
        }
    }

    /// A card at `index` within `stage_id`.
    pub fn placement(stage_id: StageId, paper_id: PaperId, index: usize, rect: Rect) -> Self {
        Self {
            stage_id,
            kind: DropTargetKind::Placement { paper_id, index },
            rect,
        }
    }

    /// The paper this target is a card for, if any.
    pub fn paper_id(&self) -> Option<&PaperId> {
        match &self.kind {
            DropTargetKind::Placement { paper_id, .. } => Some(paper_id),
            DropTargetKind::Stage => None,
        }
    }

    fn is_stage(&self) -> bool {
        matches!(self.kind, DropTargetKind::Stage)
    }
}

/// Keys the resolver understands during a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKey {
    Escape,
    Enter,
    Space,
    Up,
    Down,
    Left,
    Right,
}

/// Low-level input fed to the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEvent {
    PointerMove(Point),
    PointerUp(Point),
    PointerCancel,
    Key(DragKey),
    FocusLost,
}

/// How a drag session was started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragTrigger {
    /// Pointer pressed on a card at this location.
    Pointer(Point),
    /// Keyboard pick-up (activates immediately).
    Keyboard,
}

/// Where the dragged paper came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DragOrigin {
    pub paper_id: PaperId,
    pub stage_id: StageId,
    pub position: usize,
    /// The card's rect when the drag began.
    pub rect: Rect,
}

/// Externally visible phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
    Resolving,
}

/// Result of feeding one event to the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureUpdate {
    /// The event had no effect in the current phase.
    Ignored,
    /// A press is armed but has not travelled far enough.
    Pending,
    /// The press became a drag (`Idle → Dragging`).
    Started,
    /// The drag moved; carries the hovered target, if any.
    Moved(Option<DropTarget>),
    /// The drag was released (`Dragging → Resolving`).
    Released,
    /// The drag was cancelled (`Dragging → Idle`).
    Cancelled,
    /// An armed press ended without activating.
    Dismissed,
}

#[derive(Debug, Clone)]
struct Armed {
    origin: DragOrigin,
    press: Point,
}

#[derive(Debug, Clone)]
struct Session {
    origin: DragOrigin,
    keyboard: bool,
    press: Point,
    pointer: Point,
    hovered: Option<DropTarget>,
}

impl Session {
    fn drag_rect(&self) -> Rect {
        let (dx, dy) = self.pointer.delta_from(self.press);
        self.origin.rect.translate(dx, dy)
    }
}

#[derive(Debug, Clone)]
enum State {
    Idle { armed: Option<Armed> },
    Dragging(Session),
    Resolving(Option<Session>),
}

/// Explicitly owned drag session state for one board.
#[derive(Debug, Clone)]
pub struct GestureResolver {
    config: GestureConfig,
    targets: Vec<DropTarget>,
    state: State,
}

impl Default for GestureResolver {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureResolver {
    /// Create an idle resolver.
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            targets: Vec::new(),
            state: State::Idle { armed: None },
        }
    }

    /// Current phase.
    pub fn phase(&self) -> GesturePhase {
        match self.state {
            State::Idle { .. } => GesturePhase::Idle,
            State::Dragging(_) => GesturePhase::Dragging,
            State::Resolving(_) => GesturePhase::Resolving,
        }
    }

    /// Whether a pointer press is armed but not yet a drag.
    pub fn is_armed(&self) -> bool {
        matches!(self.state, State::Idle { armed: Some(_) })
    }

    /// The paper being dragged, if a drag is active.
    pub fn active_paper(&self) -> Option<&PaperId> {
        match &self.state {
            State::Dragging(session) | State::Resolving(Some(session)) => {
                Some(&session.origin.paper_id)
            }
            _ => None,
        }
    }

    /// Currently hovered target (visual feedback only).
    pub fn hovered(&self) -> Option<&DropTarget> {
        match &self.state {
            State::Dragging(session) => session.hovered.as_ref(),
            _ => None,
        }
    }

    /// Where the dragged card is drawn right now.
    pub fn drag_rect(&self) -> Option<Rect> {
        match &self.state {
            State::Dragging(session) => Some(session.drag_rect()),
            _ => None,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Replace the candidate drop targets.
    ///
    /// The rendering layer calls this whenever its layout changes. During a
    /// drag, the hovered target is recomputed against the new layout.
    pub fn set_targets(&mut self, targets: Vec<DropTarget>) {
        self.targets = targets;
        if let State::Dragging(session) = &mut self.state {
            session.hovered = hit_test(&self.targets, session);
        }
    }

    /// Registered drop targets.
    pub fn targets(&self) -> &[DropTarget] {
        &self.targets
    }

    /// Start a drag session for `origin`.
    ///
    /// A pointer trigger arms the session; it activates once the pointer
    /// travels past the activation distance. A keyboard trigger activates
    /// immediately. Ignored while another drag is active. A released drag
    /// whose resolution was never taken is discarded.
    pub fn begin(&mut self, origin: DragOrigin, trigger: DragTrigger) -> GestureUpdate {
        match &self.state {
            State::Dragging(_) => return GestureUpdate::Ignored,
            State::Resolving(session) => {
                tracing::debug!(
                    paper = ?session.as_ref().map(|s| s.origin.paper_id.to_string()),
                    "unclaimed drop discarded"
                );
                self.reset();
            }
            State::Idle { .. } => {}
        }
        match trigger {
            DragTrigger::Pointer(press) => {
                tracing::trace!(paper = %origin.paper_id, "drag armed");
                self.state = State::Idle {
                    armed: Some(Armed { origin, press }),
                };
                GestureUpdate::Pending
            }
            DragTrigger::Keyboard => {
                let centre = Point::new(
                    origin.rect.x + origin.rect.width / 2.0,
                    origin.rect.y + origin.rect.height / 2.0,
                );
                self.activate(origin, centre, true);
                GestureUpdate::Started
            }
        }
    }

    /// Feed one input event.
    pub fn handle(&mut self, event: DragEvent) -> GestureUpdate {
        let state = std::mem::replace(&mut self.state, State::Idle { armed: None });
        match state {
            State::Idle { armed: None } => {
                self.state = State::Idle { armed: None };
                GestureUpdate::Ignored
            }
            State::Idle { armed: Some(armed) } => self.handle_armed(armed, event),
            State::Dragging(session) => self.handle_dragging(session, event),
            resolving @ State::Resolving(_) => {
                self.state = resolving;
                GestureUpdate::Ignored
            }
        }
    }

    /// Cancel any armed press or active drag.
    pub fn cancel(&mut self) -> GestureUpdate {
        match std::mem::replace(&mut self.state, State::Idle { armed: None }) {
            State::Dragging(session) => {
                tracing::debug!(paper = %session.origin.paper_id, "drag cancelled");
                GestureUpdate::Cancelled
            }
            State::Idle { armed: Some(_) } => GestureUpdate::Dismissed,
            State::Idle { armed: None } => GestureUpdate::Ignored,
            resolving @ State::Resolving(_) => {
                self.state = resolving;
                GestureUpdate::Ignored
            }
        }
    }

    /// Hand off the released gesture and return to `Idle`.
    ///
    /// Returns the resolved intent, or `None` if the drag was released
    /// outside every drop target or onto its own slot. `snapshot` supplies
    /// column lengths for "append at end" drops on a stage container.
    /// Returns `None` and changes nothing unless the resolver is resolving.
    pub fn take_resolution(&mut self, snapshot: &PipelineSnapshot) -> Option<MoveIntent> {
        let State::Resolving(session) = &self.state else {
            return None;
        };
        let intent = session.as_ref().and_then(|s| resolve(s, snapshot));
        self.state = State::Idle { armed: None };
        intent
    }

    /// Drop all state and return to `Idle` without emitting anything.
    pub fn reset(&mut self) {
        self.state = State::Idle { armed: None };
    }

    fn handle_armed(&mut self, armed: Armed, event: DragEvent) -> GestureUpdate {
        match event {
            DragEvent::PointerMove(pos) => {
                if pos.distance(armed.press) > self.config.activation_distance {
                    self.activate(armed.origin, armed.press, false);
                    if let State::Dragging(session) = &mut self.state {
                        session.pointer = pos;
                        session.hovered = hit_test(&self.targets, session);
                    }
                    GestureUpdate::Started
                } else {
                    self.state = State::Idle { armed: Some(armed) };
                    GestureUpdate::Pending
                }
            }
            DragEvent::PointerUp(_)
            | DragEvent::PointerCancel
            | DragEvent::FocusLost
            | DragEvent::Key(DragKey::Escape) => GestureUpdate::Dismissed,
            DragEvent::Key(_) => {
                self.state = State::Idle { armed: Some(armed) };
                GestureUpdate::Ignored
            }
        }
    }

    fn handle_dragging(&mut self, mut session: Session, event: DragEvent) -> GestureUpdate {
        match event {
            DragEvent::Key(DragKey::Escape) | DragEvent::PointerCancel | DragEvent::FocusLost => {
                tracing::debug!(paper = %session.origin.paper_id, "drag cancelled");
                GestureUpdate::Cancelled
            }
            DragEvent::PointerMove(pos) if !session.keyboard => {
                session.pointer = pos;
                self.rehover(session)
            }
            DragEvent::PointerUp(pos) if !session.keyboard => {
                session.pointer = pos;
                session.hovered = hit_test(&self.targets, &session);
                self.release(session)
            }
            DragEvent::Key(key) if session.keyboard => {
                let step = self.config.keyboard_step;
                let (dx, dy) = match key {
                    DragKey::Enter | DragKey::Space => {
                        session.hovered = hit_test(&self.targets, &session);
                        return self.release(session);
                    }
                    DragKey::Up => (0.0, -step),
                    DragKey::Down => (0.0, step),
                    DragKey::Left => (-step, 0.0),
                    DragKey::Right => (step, 0.0),
                    DragKey::Escape => (0.0, 0.0),
                };
                session.pointer = Point::new(session.pointer.x + dx, session.pointer.y + dy);
                self.rehover(session)
            }
            _ => {
                self.state = State::Dragging(session);
                GestureUpdate::Ignored
            }
        }
    }

    fn activate(&mut self, origin: DragOrigin, press: Point, keyboard: bool) {
        tracing::debug!(
            paper = %origin.paper_id,
            stage = %origin.stage_id,
            position = origin.position,
            keyboard,
            "drag started"
        );
        let mut session = Session {
            origin,
            keyboard,
            press,
            pointer: press,
            hovered: None,
        };
        session.hovered = hit_test(&self.targets, &session);
        self.state = State::Dragging(session);
    }

    fn rehover(&mut self, mut session: Session) -> GestureUpdate {
        let hovered = hit_test(&self.targets, &session);
        if hovered != session.hovered {
            tracing::trace!(hovered = ?hovered.as_ref().map(|t| &t.kind), "hover changed");
        }
        session.hovered = hovered.clone();
        self.state = State::Dragging(session);
        GestureUpdate::Moved(hovered)
    }

    fn release(&mut self, session: Session) -> GestureUpdate {
        tracing::debug!(
            paper = %session.origin.paper_id,
            over = ?session.hovered.as_ref().map(|t| &t.stage_id),
            "drag released"
        );
        self.state = State::Resolving(Some(session));
        GestureUpdate::Released
    }
}

/// Pick the hovered target for the session's current drag rect.
fn hit_test(targets: &[DropTarget], session: &Session) -> Option<DropTarget> {
    let dragged = session.drag_rect();
    let pointer = session.pointer;
    let colliding = |t: &&DropTarget| t.rect.intersects(&dragged) || t.rect.contains(pointer);

    let closest = targets
        .iter()
        .filter(colliding)
        .min_by(|a, b| {
            dragged
                .corner_distance(&a.rect)
                .total_cmp(&dragged.corner_distance(&b.rect))
                .then_with(|| a.is_stage().cmp(&b.is_stage()))
        })?;

    if closest.is_stage() {
        let inner = targets
            .iter()
            .filter(colliding)
            .filter(|t| !t.is_stage() && t.stage_id == closest.stage_id)
            .min_by(|a, b| {
                dragged
                    .corner_distance(&a.rect)
                    .total_cmp(&dragged.corner_distance(&b.rect))
            });
        if let Some(inner) = inner {
            return Some(inner.clone());
        }
    }
    Some(closest.clone())
}

fn resolve(session: &Session, snapshot: &PipelineSnapshot) -> Option<MoveIntent> {
    let target = session.hovered.as_ref()?;
    let origin = &session.origin;
    let position = match &target.kind {
        DropTargetKind::Placement { index, .. } => *index,
        DropTargetKind::Stage => {
            let len = snapshot.stage_len(&target.stage_id);
            if target.stage_id == origin.stage_id {
                len.saturating_sub(1)
            } else {
                len
            }
        }
    };
    if target.stage_id == origin.stage_id && position == origin.position {
        return None;
    }
    Some(MoveIntent::new(
        origin.paper_id.clone(),
        origin.stage_id.clone(),
        target.stage_id.clone(),
        position as i64,
    ))
}
