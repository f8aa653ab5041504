use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::error::DomainError;

/// ドメイン結果
///
/// 成功した場合は値を、失敗した場合はドメイン・エラーを保有する。
pub type DomainResult<T> = Result<T, DomainError>;

/// 結果の拡張
///
/// `map`、`and_then`、`map_err`などの標準の組み合わせに加えて、結果を値に畳み込む操作と、
/// 結果を変更しない副作用を提供する。
pub trait ResultExt<T, E>: Sized {
    /// 成功した場合は`true`を返す。
    fn is_success(&self) -> bool;

    /// 失敗した場合は`true`を返す。
    fn is_failure(&self) -> bool;

    /// 成功した場合は`ok`を、失敗した場合は`err`を呼び出して、結果を1つの値に畳み込む。
    ///
    /// # 引数
    ///
    /// * `ok` - 成功した値を受け取る関数
    /// * `err` - エラーを受け取る関数
    ///
    /// # 戻り値
    ///
    /// 呼び出した関数の戻り値
    fn fold<R>(self, ok: impl FnOnce(T) -> R, err: impl FnOnce(E) -> R) -> R;

    /// 成功した場合は値を、失敗した場合は`fallback`を返す。
    fn get_or_else(self, fallback: T) -> T;

    /// 成功した場合は値を、失敗した場合はエラーから計算した値を返す。
    fn get_or_else_with(self, fallback: impl FnOnce(E) -> T) -> T;

    /// 成功した場合に値を参照する副作用を実行して、結果をそのまま返す。
    fn tap(self, f: impl FnOnce(&T)) -> Self;

    /// 失敗した場合にエラーを参照する副作用を実行して、結果をそのまま返す。
    fn tap_error(self, f: impl FnOnce(&E)) -> Self;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn is_success(&self) -> bool {
        self.is_ok()
    }

    fn is_failure(&self) -> bool {
        self.is_err()
    }

    fn fold<R>(self, ok: impl FnOnce(T) -> R, err: impl FnOnce(E) -> R) -> R {
        match self {
            Ok(value) => ok(value),
            Err(e) => err(e),
        }
    }

    fn get_or_else(self, fallback: T) -> T {
        self.unwrap_or(fallback)
    }

    fn get_or_else_with(self, fallback: impl FnOnce(E) -> T) -> T {
        self.unwrap_or_else(fallback)
    }

    fn tap(self, f: impl FnOnce(&T)) -> Self {
        if let Ok(value) = &self {
            f(value);
        }
        self
    }

    fn tap_error(self, f: impl FnOnce(&E)) -> Self {
        if let Err(e) = &self {
            f(e);
        }
        self
    }
}

/// 結果を記録して、そのまま返す。
///
/// 成功した場合は`info`レベル、失敗した場合は`error`レベルで記録する。
///
/// # 引数
///
/// * `result` - 結果
/// * `operation` - 結果を返した操作の名前
///
/// # 戻り値
///
/// 引数で受け取った結果
pub fn log_outcome<T>(result: DomainResult<T>, operation: &str) -> DomainResult<T> {
    match &result {
        Ok(_) => tracing::info!(operation, "operation succeeded"),
        Err(e) => tracing::error!(
            operation,
            error_type = %e.kind(),
            "{} ({}:{})",
            e,
            file!(),
            line!()
        ),
    }
    result
}

/// 条件が真の場合は`value`を、偽の場合は`error`を返す。
pub fn from_condition<T, E>(condition: bool, value: T, error: E) -> Result<T, E> {
    if condition {
        Ok(value)
    } else {
        Err(error)
    }
}

/// 値が述語を満たす場合は値を、満たさない場合は値から構築したエラーを返す。
///
/// # 引数
///
/// * `value` - 値
/// * `predicate` - 値が満たすべき述語
/// * `error` - 値からエラーを構築する関数
///
/// # 戻り値
///
/// 結果
pub fn ensure<T, E>(
    value: T,
    predicate: impl FnOnce(&T) -> bool,
    error: impl FnOnce(&T) -> E,
) -> Result<T, E> {
    if predicate(&value) {
        Ok(value)
    } else {
        Err(error(&value))
    }
}

/// ドメイン・エラーでないエラーを返す結果を、データベース・エラーを返すドメイン結果に変換する。
///
/// # 引数
///
/// * `result` - 変換する結果
/// * `operation` - 結果を返した操作の名前
///
/// # 戻り値
///
/// ドメイン結果
pub fn from_fallible<T, E>(result: Result<T, E>, operation: &str) -> DomainResult<T>
where
    E: std::error::Error + 'static,
{
    result.map_err(|e| {
        tracing::error!("{} ({}:{})", e, file!(), line!());
        DomainError::unexpected(operation, &e)
    })
}

/// ドメイン・エラーでないエラーを返す結果を、指定した関数でドメイン結果に変換する。
pub fn from_fallible_with<T, E>(
    result: Result<T, E>,
    on_error: impl FnOnce(E) -> DomainError,
) -> DomainResult<T> {
    result.map_err(on_error)
}

/// ドメイン・エラーでないエラーを返すフューチャーを待機して、ドメイン結果に変換する。
///
/// エラーはデータベース・エラーに変換する。
pub async fn from_future<T, E, F>(future: F, operation: &str) -> DomainResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    from_fallible(future.await, operation)
}

/// ドメイン・エラーでないエラーを返すフューチャーを待機して、指定した関数でドメイン結果に
/// 変換する。
pub async fn from_future_with<T, E, F>(
    future: F,
    on_error: impl FnOnce(E) -> DomainError,
) -> DomainResult<T>
where
    F: Future<Output = Result<T, E>>,
{
    future.await.map_err(on_error)
}

/// 複数の結果を組み合わせる。
///
/// すべて成功した場合は、値を元の順番で格納したベクタを返す。
/// 1つでも失敗した場合は、すべてのエラーを元の順番で格納したベクタを返す。
///
/// # 引数
///
/// * `results` - 組み合わせる結果
///
/// # 戻り値
///
/// 組み合わせた結果
pub fn combine_all<T, E>(results: impl IntoIterator<Item = Result<T, E>>) -> Result<Vec<T>, Vec<E>> {
    let mut values = vec![];
    let mut errors = vec![];
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(values)
    } else {
        Err(errors)
    }
}

/// 複数の結果を組み合わせて、最初に見つかったエラーを返す。
///
/// 最初のエラー以降の結果は評価しない。
pub fn combine_first_error<T, E>(
    results: impl IntoIterator<Item = Result<T, E>>,
) -> Result<Vec<T>, E> {
    results.into_iter().collect()
}

/// 複数のフューチャーを並行して待機して、結果を`combine_all`で組み合わせる。
pub async fn parallel<T, E, F>(futures: impl IntoIterator<Item = F>) -> Result<Vec<T>, Vec<E>>
where
    F: Future<Output = Result<T, E>>,
{
    combine_all(futures::future::join_all(futures).await)
}

/// 複数のフューチャーを並行して待機して、最初に成功した値を返す。
///
/// すべて失敗した場合は、完了した順番ですべてのエラーを返す。
/// フューチャーが1つもない場合は、空のエラーのベクタを返す。
pub async fn race<T, E, F>(futures: impl IntoIterator<Item = F>) -> Result<T, Vec<E>>
where
    F: Future<Output = Result<T, E>>,
{
    let mut pending: FuturesUnordered<F> = futures.into_iter().collect();
    let mut errors = vec![];
    while let Some(result) = pending.next().await {
        match result {
            Ok(value) => return Ok(value),
            Err(e) => errors.push(e),
        }
    }
    Err(errors)
}

/// バッチ処理のオプション
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// 最初に失敗した時点で、残りの要素を処理しない
    ///
    /// 並行処理する場合は無視する。
    pub stop_on_first_error: bool,
    /// すべての要素を並行して処理する
    pub concurrent: bool,
}

/// 要素ごとに処理を実行して、結果を`combine_all`で組み合わせる。
///
/// # 引数
///
/// * `items` - 処理する要素
/// * `processor` - 要素を処理する関数
/// * `options` - バッチ処理のオプション
///
/// # 戻り値
///
/// すべて成功した場合は処理結果のベクタ、失敗した場合はエラーのベクタ
pub async fn batch<I, T, E, F, Fut>(
    items: impl IntoIterator<Item = I>,
    processor: F,
    options: BatchOptions,
) -> Result<Vec<T>, Vec<E>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if options.concurrent {
        return parallel(items.into_iter().map(processor)).await;
    }

    let mut results = vec![];
    for item in items {
        let result = processor(item).await;
        let failed = result.is_err();
        results.push(result);
        if failed && options.stop_on_first_error {
            break;
        }
    }
    combine_all(results)
}

/// 再試行ポリシー
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 最大試行回数
    pub max_attempts: u32,
    /// 最初に再試行するまでの待機時間
    pub delay: Duration,
    /// 再試行するたびに待機時間に乗じる係数
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1_000),
            backoff_multiplier: 2,
        }
    }
}

/// 処理が成功するまで、ポリシーに従って再試行する。
///
/// `should_retry`が`false`を返したエラーは、再試行せずにそのまま返す。
/// 最大試行回数に達した場合は、最後のエラーを返す。
///
/// # 引数
///
/// * `operation` - 試行する処理
/// * `policy` - 再試行ポリシー
/// * `should_retry` - エラーを再試行するか判定する関数
///
/// # 戻り値
///
/// 最後に試行した処理の結果
pub async fn retry<T, E, F, Fut>(
    mut operation: F,
    policy: RetryPolicy,
    should_retry: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.delay;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if max_attempts <= attempt || !should_retry(&e) {
                    return Err(e);
                }
                tracing::warn!(attempt, max_attempts, "operation failed, retrying");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(policy.backoff_multiplier);
                attempt += 1;
            }
        }
    }
}

/// フューチャーが制限時間内に完了しなかった場合、指定したエラーを返す。
///
/// # 引数
///
/// * `future` - 待機するフューチャー
/// * `limit` - 制限時間
/// * `error` - 制限時間を超えた場合に返すエラー
///
/// # 戻り値
///
/// フューチャーの結果、または指定したエラー
pub async fn with_timeout<T, E, F>(future: F, limit: Duration, error: E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(error),
    }
}

/// 結果キャッシュの既定の有効期間
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    result: DomainResult<T>,
    stored_at: Instant,
}

/// 結果キャッシュ
///
/// キーをJSONにシリアライズした文字列で結果を記憶する。
/// 有効期間を過ぎたエントリは、読み込んだときに削除する。
#[derive(Debug)]
pub struct ResultCache<K, T> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl: Duration,
    _key: std::marker::PhantomData<fn(&K)>,
}

impl<K, T> Default for ResultCache<K, T>
where
    K: Serialize,
    T: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl<K, T> ResultCache<K, T>
where
    K: Serialize,
    T: Clone,
{
    /// 結果キャッシュを構築する。
    ///
    /// # 引数
    ///
    /// * `ttl` - エントリの有効期間
    ///
    /// # 戻り値
    ///
    /// 結果キャッシュ
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            _key: std::marker::PhantomData,
        }
    }

    fn cache_key(key: &K) -> Option<String> {
        match serde_json::to_string(key) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("cache key is not serializable: {} ({}:{})", e, file!(), line!());
                None
            }
        }
    }

    /// キーに対応する有効な結果を返す。
    pub fn get(&self, key: &K) -> Option<DomainResult<T>> {
        let key = Self::cache_key(key)?;
        {
            let entry = self.entries.get(&key)?;
            if entry.stored_at.elapsed() <= self.ttl {
                return Some(entry.result.clone());
            }
        }
        self.entries
            .remove_if(&key, |_, entry| self.ttl < entry.stored_at.elapsed());
        None
    }

    /// キーに対応する結果を記憶する。
    pub fn set(&self, key: &K, result: DomainResult<T>) {
        if let Some(key) = Self::cache_key(key) {
            self.entries.insert(
                key,
                CacheEntry {
                    result,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// すべてのエントリを削除する。
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// キーに対応する有効な結果を返す。
    ///
    /// 有効な結果がない場合は、`compute`で結果を計算して記憶した後で返す。
    pub async fn get_or_compute<F, Fut>(&self, key: &K, compute: F) -> DomainResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        if let Some(result) = self.get(key) {
            return result;
        }
        let result = compute().await;
        self.set(key, result.clone());
        result
    }
}
