// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod activities;
pub mod cashflow;
pub mod categories;
pub mod companies;
pub mod contacts;
pub mod crm;
pub mod customers;
pub mod dashboard;
pub mod deals;
pub mod entries;
pub mod forecast;
pub mod reports;
pub mod settings;
