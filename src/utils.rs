

use std::future::Future;
use std::time::Duration;


/// Char-safe prefix of `s` for log lines, with an ellipsis when cut.
#[inline]
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}


/// Awaits `fut`, bounded by `deadline` when one is set.
///
/// An elapsed deadline is turned into the caller's own error type so that
/// timeouts land in the same category as any other failure of that call.
pub async fn with_deadline<T, E, F, M>(deadline: Option<Duration>, fut: F, on_timeout: M) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    M: FnOnce(Duration) -> E,
{
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(limit)),
        },
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_preview_ascii() {
        assert_eq!(preview("hello world", 5), "hello...");
        assert_eq!(preview("hi", 10), "hi");
    }

    #[test]
    fn test_preview_multibyte() {
        assert_eq!(preview("дексмедетомидин", 4), "декс...");
    }

    #[tokio::test]
    async fn test_deadline_passes_through_result() {
        let ok: Result<u32, String> = with_deadline(
            Some(Duration::from_secs(1)),
            async { Ok(7) },
            |_| "timeout".to_string(),
        )
        .await;
        assert_eq!(assert_ok!(ok), 7);

        let err: Result<u32, String> =
            with_deadline(None, async { Err("boom".to_string()) }, |_| "timeout".to_string()).await;
        assert_eq!(assert_err!(err), "boom");
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let result: Result<(), String> = with_deadline(
            Some(Duration::from_millis(5)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            |limit| format!("timed out after {}ms", limit.as_millis()),
        )
        .await;
        assert_eq!(result, Err("timed out after 5ms".to_string()));
    }
}
