//! StatusListener port - worker からの status callback の受け口

/// Callback sink the worker reports to.
///
/// 同期メソッドのみ。実装側でブロックしないこと（worker のスレッドから呼ばれる）。
pub trait StatusListener: Send + Sync {
    fn log_to_client(&self, message: &str);

    fn on_upload_status_change(&self, uploading: bool);
}
