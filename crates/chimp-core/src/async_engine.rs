// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Asynchronous and parallel engine APIs.
//!
//! `AsyncEngine` shares one [`Engine`] session between tasks. The session
//! lock is held for a whole compile-and-run, so at most one VM run is ever
//! active on a session. `ParallelExecutor` compiles independent sources on
//! a thread pool.
//!
//! # Example
//!
//! ```ignore
//! use chimp_core::AsyncEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AsyncEngine::new();
//!     let result = engine.eval_file("script.chimp").await.unwrap();
//!     println!("{}", result);
//! }
//! ```

#[cfg(feature = "async")]
use std::path::Path;
#[cfg(feature = "async")]
use std::sync::Arc;

#[cfg(feature = "async")]
use tokio::fs;
#[cfg(feature = "async")]
use tokio::sync::Mutex;

#[cfg(feature = "async")]
use crate::{Engine, Value};
use crate::{Bytecode, Result};

/// A session that can be shared between async tasks.
#[cfg(feature = "async")]
#[derive(Clone)]
pub struct AsyncEngine {
    engine: Arc<Mutex<Engine>>,
}

#[cfg(feature = "async")]
impl AsyncEngine {
    /// Creates a new session with default limits.
    pub fn new() -> Self {
        Self::from_engine(Engine::new())
    }

    /// Wraps an existing session.
    pub fn from_engine(engine: Engine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Compiles and runs `source` as one unit of the session.
    pub async fn eval(&self, source: &str) -> Result<Value> {
        let mut engine = self.engine.lock().await;
        engine.eval(source)
    }

    /// Compiles `source` against the session without running it.
    pub async fn compile(&self, source: &str) -> Result<Bytecode> {
        let mut engine = self.engine.lock().await;
        engine.compile(source)
    }

    /// Runs a unit previously compiled by this session.
    pub async fn run(&self, bytecode: &Bytecode) -> Result<Value> {
        let mut engine = self.engine.lock().await;
        engine.run(bytecode)
    }

    /// Evaluates a script file, reading it with non-blocking I/O.
    pub async fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let source = fs::read_to_string(path).await?;
        self.eval(&source).await
    }

    /// Reads all files concurrently, then evaluates them one after another
    /// in the order given. A file that fails to read or evaluate does not
    /// stop the ones after it.
    pub async fn eval_files(&self, paths: &[impl AsRef<Path>]) -> Vec<Result<Value>> {
        let reads = paths.iter().map(|path| fs::read_to_string(path.as_ref()));
        let sources = futures::future::join_all(reads).await;

        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let result = match source {
                Ok(source) => self.eval(&source).await,
                Err(err) => Err(err.into()),
            };
            results.push(result);
        }
        results
    }
}

#[cfg(feature = "async")]
impl Default for AsyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles independent sources on a thread pool.
#[cfg(feature = "parallel")]
pub struct ParallelExecutor {
    /// Dedicated pool, or `None` for rayon's global pool
    pool: Option<rayon::ThreadPool>,
}

#[cfg(feature = "parallel")]
impl ParallelExecutor {
    /// Creates an executor on rayon's global pool.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Creates an executor with its own pool of `num_threads` threads.
    pub fn with_threads(num_threads: usize) -> std::result::Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;
        Ok(Self { pool: Some(pool) })
    }

    /// Compiles each source against fresh state, returning results in
    /// input order.
    pub fn check_parallel(&self, sources: &[&str]) -> Vec<Result<Bytecode>> {
        use rayon::prelude::*;

        let check_all = || -> Vec<Result<Bytecode>> {
            sources
                .par_iter()
                .map(|source| crate::check(source))
                .collect()
        };

        match &self.pool {
            Some(pool) => pool.install(check_all),
            None => check_all(),
        }
    }
}

#[cfg(feature = "parallel")]
impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "async"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_eval() {
        let engine = AsyncEngine::new();
        let result = engine.eval("1 + 2;").await.unwrap();
        assert_eq!(result, Value::Integer(3));
    }

    #[tokio::test]
    async fn test_async_eval_string() {
        let engine = AsyncEngine::new();
        let result = engine.eval("\"hello\" + \" world\";").await.unwrap();
        assert_eq!(result, Value::from("hello world"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_share_session() {
        let engine = AsyncEngine::new();
        engine.eval("let counter = 0;").await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.eval("counter += 1;").await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(engine.eval("counter").await.unwrap(), Value::Integer(16));
    }

    #[tokio::test]
    async fn test_eval_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.chimp");
        let second = dir.path().join("second.chimp");
        let missing = dir.path().join("missing.chimp");
        std::fs::write(&first, "let base = 10;").unwrap();
        std::fs::write(&second, "base * 2").unwrap();

        let engine = AsyncEngine::new();
        let results = engine.eval_files(&[&first, &missing, &second]).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(crate::Error::Io(_))));
        assert_eq!(results[2].as_ref().unwrap(), &Value::Integer(20));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_check_parallel() {
        let executor = ParallelExecutor::with_threads(2).unwrap();
        let results = executor.check_parallel(&["let a = 1;", "a;", "func(x) { x }"]);
        assert!(results[0].is_ok());
        // Each source is compiled against fresh state.
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
