// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for update cycles.
//!
//! Coordinators publish [`CoordinatorEvent`]s on an [`EventBus`]. Every
//! event names the account ([`EntryId`]) it belongs to, and an
//! [`EntryEvents`] subscription keeps only the events of one account.

mod coordinator_event;
mod entry_id;
mod event_bus;

pub use coordinator_event::CoordinatorEvent;
pub use entry_id::EntryId;
pub use event_bus::{EntryEvents, EventBus};
