// SPDX-License-Identifier: Apache-2.0

pub(crate) mod auth;
pub(crate) mod downloads;
pub(crate) mod errors;
pub(crate) mod generate;
pub(crate) mod pages;
pub(crate) mod resolver;
pub(crate) mod upload;
