// SPDX-FileCopyrightText: Copyright (c) 2025 SmartPath Authors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

/// Bind port 0 and return the OS-assigned port. Tests run in parallel, so
/// hardcoded ports collide.
pub async fn get_random_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().expect("failed to read local_addr");
    drop(listener);
    addr.port()
}
