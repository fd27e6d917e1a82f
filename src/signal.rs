use log::warn;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 註冊 Ctrl-C 處理器，回傳取消旗標
///
/// 旗標只會被設為 true，由匯出流程在每次開始前自行重設。
#[must_use]
pub fn setup_shutdown_signal() -> Arc<AtomicBool> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    if let Err(e) = ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        eprintln!("\n收到中斷信號，正在停止匯出並清理暫存檔...");
    }) {
        warn!("無法設定 Ctrl-C 處理器，匯出將無法中途取消: {e}");
    }

    shutdown_signal
}
