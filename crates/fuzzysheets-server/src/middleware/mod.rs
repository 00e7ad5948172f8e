// SPDX-License-Identifier: Apache-2.0

pub(crate) mod access_gate;
pub(crate) mod error_log;
pub(crate) mod request_tracing;
pub(crate) mod session;
