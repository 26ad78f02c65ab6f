//! Collaborators at the edge of the terminal: the screen, the operator
//! inputs and the door actuator. Board specific implementations live
//! outside the core; only these operations are relied upon.
use crate::devices::terminal::cart::CartLine;

/// Customer facing screen.
pub trait Display {
    /// Replaces the cart contents the screen works from.
    fn load_cart(&mut self, lines: &[CartLine]);
    /// Redraws the item list from the last loaded cart.
    fn render_list(&mut self);
    /// Redraws the running total.
    fn render_total(&mut self, total: f32);
}

/// Operator signals, consumed once each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Input {
    /// "Begin shopping" pressed on the screen.
    Begin,
    /// "Proceed to payment" pressed on the screen.
    Checkout,
    /// Payment confirmation key.
    ConfirmPayment,
}

pub trait Panel {
    /// Returns the next pending input, if any. Never blocks.
    fn poll_input(&mut self) -> Option<Input>;
}

pub trait Door {
    fn open(&mut self);
    fn close(&mut self);

    /// Lets a customer through.
    fn pulse(&mut self) {
        self.open();
        self.close();
    }
}

/// Host side doubles for the collaborators.
#[cfg(not(target_arch = "arm"))]
pub mod doubles {
    use super::*;
    use std::{collections::VecDeque, vec::Vec};

    /// Display that remembers what it was asked to show.
    #[derive(Debug, Default)]
    pub struct RecordingDisplay {
        pub cart: Vec<CartLine>,
        pub list_renders: usize,
        pub totals: Vec<f32>,
    }

    impl Display for RecordingDisplay {
        fn load_cart(&mut self, lines: &[CartLine]) { self.cart = lines.to_vec(); }
        fn render_list(&mut self) { self.list_renders += 1; }
        fn render_total(&mut self, total: f32) { self.totals.push(total); }
    }

    /// Panel replaying a queue of inputs.
    #[derive(Debug, Default)]
    pub struct ScriptedPanel {
        pub pending: VecDeque<Input>,
    }

    impl ScriptedPanel {
        pub fn press(&mut self, input: Input) { self.pending.push_back(input); }
    }

    impl Panel for ScriptedPanel {
        fn poll_input(&mut self) -> Option<Input> { self.pending.pop_front() }
    }

    /// Door recording every movement, `true` meaning open.
    #[derive(Debug, Default)]
    pub struct MockDoor {
        pub is_open: bool,
        pub movements: Vec<bool>,
    }

    impl Door for MockDoor {
        fn open(&mut self) {
            self.is_open = true;
            self.movements.push(true);
        }

        fn close(&mut self) {
            self.is_open = false;
            self.movements.push(false);
        }
    }
}
