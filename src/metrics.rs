use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, OnceLock},
};

use crate::domain::ResolveMode;

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

#[derive(Default)]
struct MetricsState {
    total: u64,
    errors: u64,
    per_endpoint: HashMap<&'static str, u64>,
    per_endpoint_err: HashMap<&'static str, u64>,
    // 托管方调用成功/失败与时延统计（毫秒）
    upstream_ok: u64,
    upstream_err: u64,
    upstream_latency_sum_ms: u128,
    // 简易直方图分桶（毫秒）：<50, <100, <250, <500, <1000, >=1000
    upstream_hist_buckets: [u64; 6],
    // Vault 开立
    vault_created_total: u64,
    vault_orphaned_total: u64,
    // 地址解析（按模式）
    resolve_total: HashMap<&'static str, u64>,
    resolve_fallback_total: u64,
    // 支持资产缓存
    asset_cache_hit: u64,
    asset_cache_miss: u64,
}

fn state() -> MutexGuard<'static, MetricsState> {
    let m = METRICS.get_or_init(|| Mutex::new(MetricsState::default()));
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn count_ok(endpoint: &'static str) {
    let mut s = state();
    s.total += 1;
    *s.per_endpoint.entry(endpoint).or_insert(0) += 1;
}

pub fn count_err(endpoint: &'static str) {
    let mut s = state();
    s.total += 1;
    s.errors += 1;
    *s.per_endpoint.entry(endpoint).or_insert(0) += 1;
    *s.per_endpoint_err.entry(endpoint).or_insert(0) += 1;
}

pub fn observe_upstream_latency_ms(latency_ms: u128, ok: bool) {
    let mut s = state();
    if ok {
        s.upstream_ok += 1;
    } else {
        s.upstream_err += 1;
    }
    s.upstream_latency_sum_ms += latency_ms;
    let b = if latency_ms < 50 {
        0
    } else if latency_ms < 100 {
        1
    } else if latency_ms < 250 {
        2
    } else if latency_ms < 500 {
        3
    } else if latency_ms < 1000 {
        4
    } else {
        5
    };
    s.upstream_hist_buckets[b] += 1;
}

pub fn inc_vault_created() {
    state().vault_created_total += 1;
}

pub fn inc_vault_orphaned() {
    state().vault_orphaned_total += 1;
}

pub fn inc_resolve(mode: ResolveMode) {
    *state().resolve_total.entry(mode.as_str()).or_insert(0) += 1;
}

/// 资产已存在 → 回退查询已有地址
pub fn inc_resolve_fallback() {
    state().resolve_fallback_total += 1;
}

pub fn inc_asset_cache(hit: bool) {
    let mut s = state();
    if hit {
        s.asset_cache_hit += 1;
    } else {
        s.asset_cache_miss += 1;
    }
}

fn push_counter(out: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    out.push_str(&format!("# HELP {} {}\n", name, help));
    out.push_str(&format!("# TYPE {} counter\n", name));
    out.push_str(&format!("{} {}\n", name, value));
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();

    push_counter(&mut out, "walletdesk_requests_total", "Total requests", s.total);
    push_counter(&mut out, "walletdesk_errors_total", "Total error responses", s.errors);

    out.push_str("# HELP walletdesk_endpoint_requests_total Requests per endpoint\n");
    out.push_str("# TYPE walletdesk_endpoint_requests_total counter\n");
    for (k, v) in s.per_endpoint.iter() {
        out.push_str(&format!(
            "walletdesk_endpoint_requests_total{{endpoint=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP walletdesk_endpoint_errors_total Errors per endpoint\n");
    out.push_str("# TYPE walletdesk_endpoint_errors_total counter\n");
    for (k, v) in s.per_endpoint_err.iter() {
        out.push_str(&format!(
            "walletdesk_endpoint_errors_total{{endpoint=\"{}\"}} {}\n",
            k, v
        ));
    }

    // 托管方统计
    out.push_str("# HELP walletdesk_custody_requests_total Custody API requests\n");
    out.push_str("# TYPE walletdesk_custody_requests_total counter\n");
    out.push_str(&format!(
        "walletdesk_custody_requests_total{{result=\"ok\"}} {}\n",
        s.upstream_ok
    ));
    out.push_str(&format!(
        "walletdesk_custody_requests_total{{result=\"err\"}} {}\n",
        s.upstream_err
    ));
    push_counter(
        &mut out,
        "walletdesk_custody_latency_ms_sum",
        "Sum of custody API latency in ms",
        s.upstream_latency_sum_ms,
    );

    out.push_str("# HELP walletdesk_custody_latency_ms_bucket Custody latency histogram buckets\n");
    out.push_str("# TYPE walletdesk_custody_latency_ms_bucket histogram\n");
    let bounds = [50, 100, 250, 500, 1000];
    let mut cumulative = 0u64;
    for (i, bound) in bounds.iter().enumerate() {
        cumulative += s.upstream_hist_buckets[i];
        out.push_str(&format!(
            "walletdesk_custody_latency_ms_bucket{{le=\"{}\"}} {}\n",
            bound, cumulative
        ));
    }
    out.push_str(&format!(
        "walletdesk_custody_latency_ms_bucket{{le=\"+Inf\"}} {}\n",
        s.upstream_hist_buckets.iter().sum::<u64>()
    ));

    push_counter(
        &mut out,
        "walletdesk_vault_created_total",
        "Vault accounts created at the custodian",
        s.vault_created_total,
    );
    push_counter(
        &mut out,
        "walletdesk_vault_orphaned_total",
        "Vault accounts created but not attached to a user",
        s.vault_orphaned_total,
    );

    out.push_str("# HELP walletdesk_address_resolve_total Address resolutions per mode\n");
    out.push_str("# TYPE walletdesk_address_resolve_total counter\n");
    for (k, v) in s.resolve_total.iter() {
        out.push_str(&format!(
            "walletdesk_address_resolve_total{{mode=\"{}\"}} {}\n",
            k, v
        ));
    }
    push_counter(
        &mut out,
        "walletdesk_address_resolve_fallback_total",
        "Asset already existed and the existing address was reused",
        s.resolve_fallback_total,
    );

    out.push_str("# HELP walletdesk_asset_cache_total Supported asset cache lookups\n");
    out.push_str("# TYPE walletdesk_asset_cache_total counter\n");
    out.push_str(&format!(
        "walletdesk_asset_cache_total{{result=\"hit\"}} {}\n",
        s.asset_cache_hit
    ));
    out.push_str(&format!(
        "walletdesk_asset_cache_total{{result=\"miss\"}} {}\n",
        s.asset_cache_miss
    ));

    out
}
