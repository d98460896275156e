//! Client-side favorite toggle, modeled as a state machine so the
//! optimistic-update and revert-on-failure paths are testable without any
//! UI framework.

use serde::Serialize;

/// State of one song's favorite control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WidgetState {
    /// Nothing known yet, nothing requested.
    Unknown,

    /// Initial favorite state is being fetched.
    Loading,

    /// Server-confirmed state, control enabled.
    Settled { favorite: bool },

    /// A toggle request is in flight. `displayed` is the optimistic state
    /// shown to the user, `prior` is what to fall back to on failure.
    Pending { displayed: bool, prior: bool },
}

impl WidgetState {
    /// The state the control should render right now.
    pub fn displayed(&self) -> Option<bool> {
        match self {
            WidgetState::Unknown | WidgetState::Loading => None,
            WidgetState::Settled { favorite } => Some(*favorite),
            WidgetState::Pending { displayed, .. } => Some(*displayed),
        }
    }

    /// Whether the control accepts a click.
    pub fn is_interactive(&self) -> bool {
        matches!(self, WidgetState::Settled { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteWidget {
    state: WidgetState,
}

impl Default for FavoriteWidget {
    fn default() -> Self {
        FavoriteWidget {
            state: WidgetState::Unknown,
        }
    }
}

impl FavoriteWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    /// Marks the initial fetch as started. Only meaningful from `Unknown`.
    pub fn begin_load(&mut self) {
        if matches!(self.state, WidgetState::Unknown) {
            self.state = WidgetState::Loading;
        }
    }

    /// Applies the fetched initial state.
    pub fn loaded(&mut self, favorite: bool) {
        if matches!(self.state, WidgetState::Loading) {
            self.state = WidgetState::Settled { favorite };
        }
    }

    /// Handles a click: flips the displayed state optimistically and returns
    /// the desired state to send to the server. Returns None while loading
    /// or while a request is already in flight; one request per click.
    pub fn toggle(&mut self) -> Option<bool> {
        match self.state {
            WidgetState::Settled { favorite } => {
                let desired = !favorite;
                self.state = WidgetState::Pending {
                    displayed: desired,
                    prior: favorite,
                };
                Some(desired)
            }
            _ => None,
        }
    }

    /// Applies the server's answer to the in-flight toggle. The server-
    /// confirmed state wins even if it differs from the optimistic flip.
    pub fn confirm(&mut self, server_favorite: bool) {
        if matches!(self.state, WidgetState::Pending { .. }) {
            self.state = WidgetState::Settled {
                favorite: server_favorite,
            };
        }
    }

    /// Reverts the optimistic flip after a failed request.
    pub fn fail(&mut self) {
        if let WidgetState::Pending { prior, .. } = self.state {
            self.state = WidgetState::Settled { favorite: prior };
        }
    }
}
