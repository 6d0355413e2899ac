// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! `proc_state!` — declares one of a concrete [`super::Processing`]'s private state
//! enums in one shot.
//!
//! The source this crate is grounded on generates a state enum and a parallel string
//! table from two macros (`dForEach_*` + `dProcessStateEnum`/`dProcessStateStr`). A
//! single `macro_rules!` plus `#[derive(strum_macros::Display)]` covers both needs here:
//! no textual identity between states is required across different Processings, so each
//! one just derives its own `Display`.
//!
//! ```
//! cotree::proc_state! {
//!     enum BrokerState {
//!         Start,
//!         WorkersStarting,
//!         Main,
//!     }
//! }
//! assert_eq!(BrokerState::Main.to_string(), "Main");
//! ```
#[macro_export]
macro_rules! proc_state {
    (enum $name:ident { $($variant:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, $crate::__private::strum_macros::Display)]
        enum $name {
            $($variant),*
        }
    };
    (pub enum $name:ident { $($variant:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, $crate::__private::strum_macros::Display)]
        pub enum $name {
            $($variant),*
        }
    };
}
