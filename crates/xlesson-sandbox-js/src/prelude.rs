//! JavaScript source fragments evaluated around the learner's code.

/// Console shim: every `console.*` call is recorded into `__console_logs` as
/// `{ level, message }` in call order.
pub const CONSOLE_SHIM: &str = r#"
var __console_logs = [];
var console = (function () {
    function format(value) {
        if (typeof value === 'string') { return value; }
        if (typeof value === 'object' && value !== null) {
            try { return JSON.stringify(value); } catch (e) { return String(value); }
        }
        return String(value);
    }
    function capture(level) {
        return function () {
            var parts = [];
            for (var i = 0; i < arguments.length; i++) { parts.push(format(arguments[i])); }
            __console_logs.push({ level: level, message: parts.join(' ') });
        };
    }
    return {
        log: capture('log'),
        debug: capture('log'),
        info: capture('info'),
        warn: capture('warn'),
        error: capture('error')
    };
})();
"#;

/// Virtual-clock timers. `setTimeout` queues the callback with a due time; the host
/// drains the queue through `__run_next_timer` once the microtask queue is empty, firing
/// timers in due-time order without sleeping. Only function callbacks are accepted.
pub const TIMER_SHIM: &str = r#"
var __timer_state = { seq: 0, clock: 0, queue: [] };
function setTimeout(callback, delay) {
    if (typeof callback !== 'function') {
        throw new TypeError('setTimeout expects a function callback');
    }
    var wait = +delay;
    if (!(wait > 0)) { wait = 0; }
    var id = ++__timer_state.seq;
    __timer_state.queue.push({
        id: id,
        at: __timer_state.clock + wait,
        callback: callback,
        args: Array.prototype.slice.call(arguments, 2)
    });
    return id;
}
function clearTimeout(id) {
    var queue = __timer_state.queue;
    for (var i = 0; i < queue.length; i++) {
        if (queue[i].id === id) { queue.splice(i, 1); return; }
    }
}
function __run_next_timer() {
    var queue = __timer_state.queue;
    if (queue.length === 0) { return false; }
    var next = 0;
    for (var i = 1; i < queue.length; i++) {
        var a = queue[i], b = queue[next];
        if (a.at < b.at || (a.at === b.at && a.id < b.id)) { next = i; }
    }
    var timer = queue.splice(next, 1)[0];
    __timer_state.clock = timer.at;
    timer.callback.apply(undefined, timer.args);
    return true;
}
"#;

/// Fires the earliest pending timer; evaluates to `false` when none is left.
pub const RUN_NEXT_TIMER: &str = "__run_next_timer()";

/// Names the shims define; they survive pruning.
pub const SHIM_GLOBALS: &[&str] = &[
    "console",
    "__console_logs",
    "setTimeout",
    "clearTimeout",
    "__timer_state",
    "__run_next_timer",
];

/// Evaluates to a JSON string of everything captured so far.
pub const READ_LOGS: &str =
    "(typeof __console_logs !== 'undefined' && Array.isArray(__console_logs)) ? JSON.stringify(__console_logs) : '[]'";

/// Evaluates to a function that JSON-encodes a value, throwing when the value has
/// no faithful JSON form (undefined, functions, symbols, bigints, non-finite numbers, cycles).
pub const STRICT_ENCODER: &str = r#"
(function (value) {
    var stack = [];
    function check(v, path) {
        var t = typeof v;
        if (v === null || t === 'string' || t === 'boolean') { return; }
        if (t === 'number') {
            if (!isFinite(v)) { throw new Error(path + ' is ' + String(v) + ', which has no JSON form'); }
            return;
        }
        if (t === 'undefined') { throw new Error(path + ' is undefined'); }
        if (t === 'function' || t === 'symbol' || t === 'bigint') { throw new Error(path + ' is a ' + t); }
        if (stack.indexOf(v) !== -1) { throw new Error(path + ' is a circular reference'); }
        stack.push(v);
        if (Array.isArray(v)) {
            for (var i = 0; i < v.length; i++) { check(v[i], path + '[' + i + ']'); }
        } else {
            var keys = Object.keys(v);
            for (var k = 0; k < keys.length; k++) { check(v[keys[k]], path + '.' + keys[k]); }
        }
        stack.pop();
    }
    check(value, 'return value');
    return JSON.stringify(value);
})
"#;

/// Removes every configurable global not in `allowed`, optionally freezing the global
/// object and the core prototypes afterwards.
pub fn isolation_script(allowed: &[String], freeze_globals: bool) -> String {
    let allowed_list = allowed
        .iter()
        .map(|name| format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"
var __allowed_globals = new Set([{allowed_list}]);
var __global = (typeof globalThis !== 'undefined') ? globalThis : this;
var __Function = __global.Function;
Object.getOwnPropertyNames(__global).forEach(function (key) {{
    if (!__allowed_globals.has(key)) {{
        try {{ delete __global[key]; }} catch (e) {{ __global[key] = undefined; }}
    }}
}});
{freeze}
"#,
        allowed_list = allowed_list,
        freeze = if freeze_globals {
            "Object.freeze(__global); Object.freeze(Object.prototype); Object.freeze(Array.prototype); if (typeof __Function !== 'undefined') { Object.freeze(__Function.prototype); }"
        } else {
            ""
        }
    )
}

/// Globals the shim and the output encoder rely on; always kept.
pub const REQUIRED_GLOBALS: &[&str] = &[
    "Array",
    "Error",
    "JSON",
    "Object",
    "Set",
    "String",
    "TypeError",
    "isFinite",
];

/// Console and timer shims, in evaluation order.
pub fn shims() -> String {
    format!("{}\n{}", CONSOLE_SHIM, TIMER_SHIM)
}

/// Full script for one job: shims, isolation, then the learner's code, in a single
/// evaluation so hoisted declarations exist before isolation runs.
pub fn wrap_user_code(code: &str, allowed: &[String], freeze_globals: bool) -> String {
    let mut allowed = allowed.to_vec();
    allowed.extend(REQUIRED_GLOBALS.iter().map(|name| name.to_string()));
    allowed.extend(SHIM_GLOBALS.iter().map(|name| name.to_string()));
    allowed.sort();
    allowed.dedup();

    format!(
        "{shims}\n{isolation}\n{code}\n",
        shims = shims(),
        isolation = isolation_script(&allowed, freeze_globals),
        code = code,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_script_lists_allowed_globals() {
        let script = isolation_script(&["JSON".into(), "Math".into()], false);
        assert!(script.contains(r#"new Set(["JSON","Math"])"#));
        assert!(!script.contains("Object.freeze(__global)"));
    }

    #[test]
    fn test_isolation_script_freezes_on_request() {
        let script = isolation_script(&[], true);
        assert!(script.contains("Object.freeze(__global)"));
    }

    #[test]
    fn test_wrap_keeps_console_reachable() {
        let wrapped = wrap_user_code("console.log(1);", &["JSON".into()], false);
        assert!(wrapped.contains(r#""__console_logs""#));
        assert!(wrapped.contains(r#""console""#));
        assert!(wrapped.contains(r#""setTimeout""#));
        assert!(wrapped.contains(r#""__run_next_timer""#));
        assert!(wrapped.trim_end().ends_with("console.log(1);"));
    }
}
