//! courier-core
//!
//! Forward a client-described HTTP call, record the outcome, and serve the
//! recorded history.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（CallDescriptor, CallResult, HistoryRecord, Page, errors）
//! - **ports**: 抽象化レイヤー（HistoryStore, Forwarder, Clock）
//! - **impls**: 実装（InMemoryHistoryStore, SqliteHistoryStore, HttpForwarder）
//! - **app**: アプリケーション層（AppBuilder, Relay, HTTP routes）
//! - **config**: AppBuilder が受け取る設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
