//! Demo task functions for the CLI: one CPU-bound, one I/O-bound, one that counts bytes.

use clap::ValueEnum;
use serde::Deserialize;
use std::hint::black_box;
use std::thread;

use crate::utils::config::{CPU_TASK_ITERATIONS, IO_TASK_LATENCY, PoolSize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    /// Burn CPU per chunk; counts chunks.
    #[default]
    Cpu,
    /// Sleep per chunk to simulate a network or database call; counts chunks.
    Io,
    /// Sum of chunk lengths.
    Bytes,
}

impl TaskMode {
    /// Pool size suited to the workload.
    pub fn default_pool_size(self) -> usize {
        match self {
            TaskMode::Cpu | TaskMode::Bytes => PoolSize::cpu_bound(),
            TaskMode::Io => PoolSize::io_bound(),
        }
    }

    pub fn task_fn(self) -> fn(Vec<u8>) -> i64 {
        match self {
            TaskMode::Cpu => task_cpu,
            TaskMode::Io => task_io,
            TaskMode::Bytes => task_bytes,
        }
    }
}

pub fn task_cpu(chunk: Vec<u8>) -> i64 {
    let mut sum = 0_usize;
    for i in 0..CPU_TASK_ITERATIONS {
        sum = sum.wrapping_add(i.wrapping_mul(chunk.len()) % 255);
    }
    black_box(sum);
    1
}

pub fn task_io(_chunk: Vec<u8>) -> i64 {
    thread::sleep(IO_TASK_LATENCY);
    1
}

pub fn task_bytes(chunk: Vec<u8>) -> i64 {
    chunk.len() as i64
}
