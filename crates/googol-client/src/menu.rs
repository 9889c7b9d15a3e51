//! State machines for the console's operation selector and admin panel.
use shared::event::OperationType;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MenuState {
    #[default]
    Idle,
    Expanded,
    /// Collapsing, input is ignored until the transition finishes.
    Transitioning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuInput {
    PointerEnter,
    PointerLeave,
    TransitionFinished,
    Select(OperationType),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuEffect {
    Show,
    Hide,
    OperationChanged(OperationType),
}

/// Transition table: `(state, input) -> (next state, effect)`.
pub fn transition(
    state: MenuState,
    current: OperationType,
    input: MenuInput,
) -> (MenuState, Option<MenuEffect>) {
    use MenuInput::*;
    use MenuState::*;

    match (state, input) {
        (Idle, PointerEnter) => (Expanded, Some(MenuEffect::Show)),
        (Expanded, PointerLeave) => (Transitioning, Some(MenuEffect::Hide)),
        (Transitioning, TransitionFinished) => (Idle, None),
        (Expanded, Select(op)) if op != current => (Expanded, Some(MenuEffect::OperationChanged(op))),
        (state, _) => (state, None),
    }
}

#[derive(Clone, Debug, Default)]
pub struct OperationMenu {
    state: MenuState,
    operation: OperationType,
}

impl OperationMenu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn operation(&self) -> OperationType {
        self.operation
    }

    pub fn handle(&mut self, input: MenuInput) -> Option<MenuEffect> {
        let (next, effect) = transition(self.state, self.operation, input);
        if let Some(MenuEffect::OperationChanged(op)) = effect {
            self.operation = op;
        }

        self.state = next;
        effect
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdminPanel {
    #[default]
    Closed,
    Open,
}

impl AdminPanel {
    pub fn toggle(self) -> Self {
        match self {
            AdminPanel::Closed => AdminPanel::Open,
            AdminPanel::Open => AdminPanel::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        *self == AdminPanel::Open
    }
}
