use crate::hooks::NoticeReceiver;
use crate::telemetry::log_notice;

#[embassy_executor::task]
pub async fn run(notices: NoticeReceiver<'static>) -> ! {
    loop {
        let notice = notices.receive().await;
        log_notice(notice);
    }
}
