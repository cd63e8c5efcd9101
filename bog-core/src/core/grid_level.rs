//! Per-level state machine for a single grid rung.
//!
//! ```text
//!                     place_open
//!   NOT_ACTIVE  ────────────────────▶  OPEN_PLACED
//!        ▲                                 │   │
//!        │          cancel_open            │   │ on_fill
//!        └─────────────────────────────────┘   ▼
//!                                         OPEN_FILLED
//!                                           │    ▲
//!                                 place_close    │ cancel_close
//!                                           ▼    │
//!                                        CLOSE_PLACED
//!                                              │
//!                                       on_fill (close)
//!                                              ▼
//!                                           COMPLETE
//!                                              │
//!                                            reset
//!                                              ▼
//!                                         NOT_ACTIVE
//! ```
//!
//! Modeled as a runtime enum, not a typestate: a single executor owns a
//! `Vec<GridLevel>` it mutates in place every tick, so the state needs to be
//! inspectable and cheaply storable in a collection rather than encoded in
//! the type of a value passed around the call stack.

use crate::core::types::{ExchangeOrderId, LevelId, Side};
use rust_decimal::Decimal;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLevelState {
    NotActive,
    OpenPlaced,
    OpenFilled,
    ClosePlaced,
    Complete,
}

impl fmt::Display for GridLevelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GridLevelState::NotActive => "NOT_ACTIVE",
            GridLevelState::OpenPlaced => "OPEN_PLACED",
            GridLevelState::OpenFilled => "OPEN_FILLED",
            GridLevelState::ClosePlaced => "CLOSE_PLACED",
            GridLevelState::Complete => "COMPLETE",
        };
        write!(f, "{}", s)
    }
}

/// An attempted transition that the current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: GridLevelState,
    pub attempted: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {} from state {}", self.attempted, self.from)
    }
}

impl std::error::Error for TransitionError {}

/// One rung of the grid: a price level that cycles between an open (entry)
/// order and a close (take-profit) order.
#[derive(Debug, Clone)]
pub struct GridLevel {
    pub id: LevelId,
    pub open_price: Decimal,
    pub close_price: Decimal,
    pub amount: Decimal,
    pub open_side: Side,
    state: GridLevelState,
    pub open_order_id: Option<ExchangeOrderId>,
    pub close_order_id: Option<ExchangeOrderId>,
}

impl GridLevel {
    pub fn new(id: LevelId, open_price: Decimal, close_price: Decimal, amount: Decimal, open_side: Side) -> Self {
        Self {
            id,
            open_price,
            close_price,
            amount,
            open_side,
            state: GridLevelState::NotActive,
            open_order_id: None,
            close_order_id: None,
        }
    }

    pub fn state(&self) -> GridLevelState {
        self.state
    }

    pub fn place_open(&mut self, order_id: ExchangeOrderId) -> Result<(), TransitionError> {
        match self.state {
            GridLevelState::NotActive => {
                self.open_order_id = Some(order_id);
                self.state = GridLevelState::OpenPlaced;
                Ok(())
            }
            _ => Err(TransitionError { from: self.state, attempted: "place_open" }),
        }
    }

    /// The open order filled fully; the level now holds inventory.
    pub fn on_open_filled(&mut self) -> Result<(), TransitionError> {
        match self.state {
            GridLevelState::OpenPlaced => {
                self.state = GridLevelState::OpenFilled;
                Ok(())
            }
            _ => Err(TransitionError { from: self.state, attempted: "on_open_filled" }),
        }
    }

    /// The open order was canceled before it filled.
    pub fn cancel_open(&mut self) -> Result<(), TransitionError> {
        match self.state {
            GridLevelState::OpenPlaced => {
                self.open_order_id = None;
                self.state = GridLevelState::NotActive;
                Ok(())
            }
            _ => Err(TransitionError { from: self.state, attempted: "cancel_open" }),
        }
    }

    pub fn place_close(&mut self, order_id: ExchangeOrderId) -> Result<(), TransitionError> {
        match self.state {
            GridLevelState::OpenFilled => {
                self.close_order_id = Some(order_id);
                self.state = GridLevelState::ClosePlaced;
                Ok(())
            }
            _ => Err(TransitionError { from: self.state, attempted: "place_close" }),
        }
    }

    /// The close order was canceled (e.g. repriced); the level still holds
    /// its inventory and falls back to OPEN_FILLED so a new close can be placed.
    pub fn cancel_close(&mut self) -> Result<(), TransitionError> {
        match self.state {
            GridLevelState::ClosePlaced => {
                self.close_order_id = None;
                self.state = GridLevelState::OpenFilled;
                Ok(())
            }
            _ => Err(TransitionError { from: self.state, attempted: "cancel_close" }),
        }
    }

    /// The close order filled fully; the round trip is done.
    pub fn on_close_filled(&mut self) -> Result<(), TransitionError> {
        match self.state {
            GridLevelState::ClosePlaced => {
                self.state = GridLevelState::Complete;
                Ok(())
            }
            _ => Err(TransitionError { from: self.state, attempted: "on_close_filled" }),
        }
    }

    /// Releases the level to accept a fresh open order.
    pub fn reset(&mut self) -> Result<(), TransitionError> {
        match self.state {
            GridLevelState::Complete => {
                self.open_order_id = None;
                self.close_order_id = None;
                self.state = GridLevelState::NotActive;
                Ok(())
            }
            _ => Err(TransitionError { from: self.state, attempted: "reset" }),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GridLevelState::NotActive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level() -> GridLevel {
        GridLevel::new(LevelId(0), dec!(0.17), dec!(0.1704), dec!(50), Side::Buy)
    }

    #[test]
    fn happy_path_round_trip() {
        let mut l = level();
        assert_eq!(l.state(), GridLevelState::NotActive);

        l.place_open(ExchangeOrderId("1".into())).unwrap();
        assert_eq!(l.state(), GridLevelState::OpenPlaced);

        l.on_open_filled().unwrap();
        assert_eq!(l.state(), GridLevelState::OpenFilled);

        l.place_close(ExchangeOrderId("2".into())).unwrap();
        assert_eq!(l.state(), GridLevelState::ClosePlaced);

        l.on_close_filled().unwrap();
        assert_eq!(l.state(), GridLevelState::Complete);

        l.reset().unwrap();
        assert_eq!(l.state(), GridLevelState::NotActive);
    }

    #[test]
    fn open_cancel_returns_to_not_active() {
        let mut l = level();
        l.place_open(ExchangeOrderId("1".into())).unwrap();
        l.cancel_open().unwrap();
        assert_eq!(l.state(), GridLevelState::NotActive);
        assert!(l.open_order_id.is_none());
    }

    #[test]
    fn close_cancel_returns_to_open_filled() {
        let mut l = level();
        l.place_open(ExchangeOrderId("1".into())).unwrap();
        l.on_open_filled().unwrap();
        l.place_close(ExchangeOrderId("2".into())).unwrap();
        l.cancel_close().unwrap();
        assert_eq!(l.state(), GridLevelState::OpenFilled);
        assert!(l.close_order_id.is_none());
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut l = level();
        let err = l.on_open_filled().unwrap_err();
        assert_eq!(err.from, GridLevelState::NotActive);
        assert_eq!(err.attempted, "on_open_filled");

        l.place_open(ExchangeOrderId("1".into())).unwrap();
        assert!(l.place_open(ExchangeOrderId("2".into())).is_err());
        assert!(l.place_close(ExchangeOrderId("2".into())).is_err());
    }

    #[test]
    fn is_active_tracks_not_active_state() {
        let mut l = level();
        assert!(!l.is_active());
        l.place_open(ExchangeOrderId("1".into())).unwrap();
        assert!(l.is_active());
    }
}
