//! The `pm` capability surface
//!
//! Everything a test script may see is snapshotted into a [`PmContext`]
//! before the sandbox starts, serialized into the fresh JavaScript context,
//! and assembled there by a bootstrap script into the frozen `pm` object.
//! The script has no other bindings: no process state, filesystem, network,
//! or timers.

use std::collections::HashMap;

use serde_json::{json, Value as JsonValue};

use crate::cookies::cookie_map;
use crate::request::RequestDescriptor;
use crate::response::NormalizedResponse;

/// Per-item ephemeral variable stores.
///
/// Created empty at the start of an assertion run and discarded at its end;
/// they never touch the host's own variable or credential stores.
#[derive(Debug, Clone, Default)]
pub struct VariableStores {
    pub environment: HashMap<String, JsonValue>,
    pub globals: HashMap<String, JsonValue>,
}

/// Read-only snapshot handed to the sandbox for one run
#[derive(Debug, Clone)]
pub struct PmContext {
    iteration: usize,
    iteration_count: usize,
    request_name: String,
    request: JsonValue,
    response: JsonValue,
    cookies: JsonValue,
    environment: JsonValue,
    globals: JsonValue,
}

impl PmContext {
    pub fn from_parts(
        iteration: usize,
        iteration_count: usize,
        request_name: &str,
        descriptor: &RequestDescriptor,
        response: &NormalizedResponse,
        stores: &VariableStores,
    ) -> Self {
        let cookies = JsonValue::Object(
            cookie_map(&response.set_cookie)
                .into_iter()
                .map(|(k, v)| (k, JsonValue::String(v)))
                .collect(),
        );

        let request = json!({
            "method": descriptor.method.as_str(),
            "url": descriptor.url,
            "headers": descriptor.headers_json(),
            "query": descriptor.query_json(),
            "body": descriptor.body.meta(),
        });

        let response = json!({
            "status": response.status_code,
            "reason": response.status_message,
            "headers": response.headers_json(),
            "body": response.parsed.to_json(),
            "responseTime": response.elapsed_ms,
            "size": response.size_bytes,
        });

        Self {
            iteration,
            iteration_count,
            request_name: request_name.to_string(),
            request,
            response,
            cookies,
            environment: json!(stores.environment),
            globals: json!(stores.globals),
        }
    }

    /// Serialize the whole snapshot for injection as the `__pm` global
    pub fn to_json(&self) -> JsonValue {
        json!({
            "info": {
                "iteration": self.iteration,
                "requestName": self.request_name,
                "iterationCount": self.iteration_count,
            },
            "request": self.request,
            "response": self.response,
            "cookies": self.cookies,
            "environment": self.environment,
            "globals": self.globals,
        })
    }
}

/// Bootstrap evaluated before the user script. Builds the assertion DSL and
/// the frozen `pm` object from the injected `__pm` snapshot and the native
/// `__record` test recorder, then removes both injected globals: the user
/// script sees `pm`, `chai`, and `expect` and nothing else. `chai` and
/// `expect` are exposed for scripts that reference the assertion library's
/// root object directly.
pub(crate) const PM_BOOTSTRAP: &str = r#"
(function () {
'use strict';

const snapshot = globalThis.__pm;
const record = globalThis.__record;
delete globalThis.__pm;
delete globalThis.__record;

function fail(message) { throw new Error(message); }

function show(value) {
  if (value === undefined) return 'undefined';
  try {
    const text = JSON.stringify(value);
    return text === undefined ? String(value) : text;
  } catch (e) {
    return String(value);
  }
}

function deepEq(a, b) {
  if (a === b) return true;
  if (a === null || b === null) return false;
  if (typeof a !== 'object' || typeof b !== 'object') return false;
  if (Array.isArray(a) !== Array.isArray(b)) return false;
  const keysA = Object.keys(a);
  const keysB = Object.keys(b);
  if (keysA.length !== keysB.length) return false;
  for (const key of keysA) {
    if (!deepEq(a[key], b[key])) return false;
  }
  return true;
}

function expect(actual) {
  function check(ok, negate, message) {
    if (ok === negate) fail(message);
  }
  function assertions(negate) {
    const no = negate ? 'not ' : '';
    const a = {
      equal(expected) {
        check(actual === expected, negate,
          'expected ' + show(actual) + ' ' + no + 'to equal ' + show(expected));
        return a;
      },
      eql(expected) {
        check(deepEq(actual, expected), negate,
          'expected ' + show(actual) + ' ' + no + 'to deeply equal ' + show(expected));
        return a;
      },
      include(member) {
        let ok = false;
        if (typeof actual === 'string') ok = actual.includes(String(member));
        else if (Array.isArray(actual)) ok = actual.some((item) => deepEq(item, member));
        else if (actual !== null && typeof actual === 'object' &&
                 member !== null && typeof member === 'object')
          ok = Object.keys(member).every((key) => deepEq(actual[key], member[key]));
        check(ok, negate,
          'expected ' + show(actual) + ' ' + no + 'to include ' + show(member));
        return a;
      },
      satisfy(predicate) {
        check(!!predicate(actual), negate,
          'expected ' + show(actual) + ' ' + no + 'to satisfy the given predicate');
        return a;
      },
      above(bound) {
        check(actual > bound, negate,
          'expected ' + show(actual) + ' ' + no + 'to be above ' + show(bound));
        return a;
      },
      below(bound) {
        check(actual < bound, negate,
          'expected ' + show(actual) + ' ' + no + 'to be below ' + show(bound));
        return a;
      },
      property(name, value) {
        const present = actual !== null && typeof actual === 'object' && name in actual;
        const ok = value === undefined ? present : present && deepEq(actual[name], value);
        check(ok, negate,
          'expected ' + show(actual) + ' ' + no + 'to have property ' + show(name));
        return a;
      },
      lengthOf(expected) {
        const length = actual === null || actual === undefined ? undefined : actual.length;
        check(length === expected, negate,
          'expected ' + show(actual) + ' ' + no + 'to have length ' + show(expected));
        return a;
      },
      get ok() {
        check(!!actual, negate, 'expected ' + show(actual) + ' ' + no + 'to be truthy');
        return a;
      },
      get undefined() {
        check(actual === undefined, negate,
          'expected ' + show(actual) + ' ' + no + 'to be undefined');
        return a;
      },
      get null() {
        check(actual === null, negate,
          'expected ' + show(actual) + ' ' + no + 'to be null');
        return a;
      },
    };
    return a;
  }
  const to = assertions(false);
  const notTo = assertions(true);
  to.not = notTo;
  to.be = to;
  to.have = to;
  to.deep = { equal: to.eql, include: to.include };
  notTo.be = notTo;
  notTo.have = notTo;
  notTo.deep = { equal: notTo.eql, include: notTo.include };
  return { to: to };
}

const env = Object.assign({}, snapshot.environment);
const globals = Object.assign({}, snapshot.globals);
const cookies = Object.assign({}, snapshot.cookies);

function store(backing) {
  return Object.freeze({
    get: (key) => backing[key],
    set: (key, value) => { backing[key] = value; },
    unset: (key) => { delete backing[key]; },
    clear: () => { for (const key of Object.keys(backing)) delete backing[key]; },
  });
}

function header(name) {
  const wanted = String(name).toLowerCase();
  for (const key of Object.keys(snapshot.response.headers)) {
    if (key.toLowerCase() === wanted) return snapshot.response.headers[key];
  }
  return undefined;
}

const pm = Object.freeze({
  expect: expect,

  info: Object.freeze({
    iteration: snapshot.info.iteration,
    requestName: snapshot.info.requestName,
    iterationCount: snapshot.info.iterationCount,
  }),

  response: Object.freeze({
    status: snapshot.response.status,
    code: snapshot.response.status,
    reason: snapshot.response.reason,
    headers: snapshot.response.headers,
    body: snapshot.response.body,
    responseTime: snapshot.response.responseTime,
    size: snapshot.response.size,
    to: Object.freeze({
      have: Object.freeze({
        status: (code) => expect(snapshot.response.status).to.equal(code),
        header: (name) => expect(header(name)).to.not.equal(undefined),
        headerValue: (name, value) => expect(header(name)).to.satisfy(
          (actual) => String(actual).toLowerCase().includes(String(value).toLowerCase())),
      }),
    }),
  }),

  request: Object.freeze(snapshot.request),

  test: (name, fn) => {
    try {
      fn();
      record(String(name), true, undefined);
    } catch (e) {
      record(String(name), false, e && e.message !== undefined ? String(e.message) : String(e));
    }
  },

  cookies: Object.freeze({
    get: (name) => cookies[name],
    has: (name) => Object.prototype.hasOwnProperty.call(cookies, name),
    toObject: () => Object.assign({}, cookies),
  }),

  environment: store(env),
  globals: store(globals),

  variables: Object.freeze({
    get: (key) => (env[key] !== undefined ? env[key] : globals[key]),
    set: (key, value) => { env[key] = value; },
    unset: (key) => { delete env[key]; delete globals[key]; },
  }),
});

globalThis.pm = pm;
globalThis.chai = Object.freeze({ expect: expect });
globalThis.expect = expect;
})();
"#;
