use std::{future::Future, time::Duration};

/// Run `fut` to completion on a fresh current-thread runtime.
pub fn run_with_tokio<O, F: Future<Output = O>>(fut: F) -> O {
    test_tokio_runtime().block_on(fut)
}

/// Like [run_with_tokio](fn.run_with_tokio.html), but fails the test when `fut` runs longer than
/// `limit`.
pub fn run_with_timeout<O, F: Future<Output = O>>(limit: Duration, fut: F) -> O {
    test_tokio_runtime().block_on(async move {
        match tokio::time::timeout(limit, fut).await {
            Ok(output) => output,
            Err(_) => panic!("test did not finish within {limit:?}"),
        }
    })
}

pub fn test_tokio_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}
