//! Page-side scripts backing [`ChromiumDom`](crate::ChromiumDom).
//!
//! Each call is one `Runtime.evaluate` of an IIFE. The prelude keeps a per-document handle
//! registry (`WeakMap` element -> id, `Map` id -> `WeakRef`) so handles survive across calls and
//! go stale with the document. Entries whose element was collected are dropped on lookup and
//! swept every 1024 registrations. Every script returns an envelope
//! `{ ok, value }` / `{ ok: false, kind, message }`.

use serde_json::Value;

const PRELUDE: &str = r#"
const R = window.__relist || (window.__relist = {
  seq: Math.floor(Math.random() * 1e6) * 1e6,
  ids: new WeakMap(),
  els: new Map(),
});
const sweep = () => {
  for (const [id, ref] of R.els) {
    if (!ref.deref()) R.els.delete(id);
  }
};
const handleOf = (el) => {
  let id = R.ids.get(el);
  if (id === undefined) {
    id = ++R.seq;
    R.ids.set(el, id);
    R.els.set(id, new WeakRef(el));
    if (R.els.size % 1024 === 0) sweep();
  }
  return id;
};
const fail = (kind, message) => {
  const err = new Error(message);
  err.relist = kind;
  throw err;
};
const lookup = (id) => {
  const ref = R.els.get(id);
  const el = ref && ref.deref();
  if (ref && !el) R.els.delete(id);
  if (!el || !el.isConnected) fail('stale', 'stale handle ' + id);
  return el;
};
const queryAll = (root, sel) => {
  try {
    return Array.from(root.querySelectorAll(sel));
  } catch (e) {
    fail('selector', sel);
  }
};
"#;

pub(crate) const CURRENT_URL: &str = "return location.href;";

pub(crate) const TITLE: &str = "return document.title || '';";

pub(crate) const BODY_TEXT: &str = "return (document.body && document.body.innerText) || '';";

pub(crate) const QUERY_ALL: &str = r#"
const root = args.scope == null ? document : lookup(args.scope);
return queryAll(root, args.selector).map(handleOf);
"#;

pub(crate) const DESCRIBE: &str = r#"
const el = lookup(args.handle);
const cs = getComputedStyle(el);
const r = el.getBoundingClientRect();
const attributes = {};
for (const a of el.attributes) attributes[a.name] = a.value;
const raw = el.innerText !== undefined ? el.innerText : el.textContent;
const text = (raw || '').replace(/\s+/g, ' ').trim();
const options = el.tagName === 'SELECT'
  ? Array.from(el.options).map((o) => ({ value: o.value, text: (o.text || '').trim(), selected: o.selected }))
  : [];
const value = typeof el.value === 'string' ? el.value : '';
return {
  tag: el.tagName.toLowerCase(),
  attributes,
  text,
  value,
  style: { display: cs.display, visibility: cs.visibility, opacity: parseFloat(cs.opacity) || 0 },
  rect: { x: r.x, y: r.y, width: r.width, height: r.height },
  options,
};
"#;

pub(crate) const CLOSEST: &str = r#"
const el = lookup(args.handle);
let found = null;
try {
  found = el.closest(args.selector);
} catch (e) {
  fail('selector', args.selector);
}
return found ? handleOf(found) : null;
"#;

// Native setters so framework-controlled inputs observe the change.
pub(crate) const SET_VALUE: &str = r#"
const el = lookup(args.handle);
const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
  : el instanceof HTMLSelectElement ? HTMLSelectElement.prototype
  : el instanceof HTMLInputElement ? HTMLInputElement.prototype
  : null;
const desc = proto && Object.getOwnPropertyDescriptor(proto, 'value');
if (desc && desc.set) {
  desc.set.call(el, args.value);
} else if (el.isContentEditable) {
  el.textContent = args.value;
} else {
  el.value = args.value;
}
return null;
"#;

pub(crate) const DISPATCH: &str = r#"
const el = lookup(args.handle);
const ev = args.event;
let event;
switch (ev.kind) {
  case 'input':
    event = new InputEvent('input', { bubbles: true });
    break;
  case 'change':
    event = new Event('change', { bubbles: true });
    break;
  case 'focus':
  case 'blur':
    event = new FocusEvent(ev.kind);
    break;
  case 'keydown':
  case 'keyup':
    event = new KeyboardEvent(ev.kind, { key: ev.key, bubbles: true, cancelable: true });
    break;
  default:
    event = new MouseEvent(ev.kind, { bubbles: true, cancelable: true, view: window });
}
el.dispatchEvent(event);
return null;
"#;

pub(crate) const FOCUS: &str = "lookup(args.handle).focus(); return null;";

pub(crate) const NATIVE_CLICK: &str = "lookup(args.handle).click(); return null;";

pub(crate) const SCROLL_INTO_VIEW: &str = r#"
lookup(args.handle).scrollIntoView({ block: 'center', inline: 'center', behavior: 'instant' });
return null;
"#;

pub(crate) const SCROLL_VIEWPORT: &str = "window.scrollBy(0, args.dy); return null;";

pub(crate) const SET_FILES: &str = r#"
const el = lookup(args.handle);
const dt = new DataTransfer();
for (const f of args.files) {
  const bin = atob(f.data);
  const bytes = new Uint8Array(bin.length);
  for (let i = 0; i < bin.length; i++) bytes[i] = bin.charCodeAt(i);
  dt.items.add(new File([bytes], f.name, { type: f.mime }));
}
el.files = dt.files;
return dt.files.length;
"#;

/// Wrap a script body into a self-contained expression with `args` bound.
pub(crate) fn wrap(body: &str, args: &Value) -> String {
    format!(
        r#"(() => {{
{PRELUDE}
const args = {args};
try {{
  const value = (() => {{ {body} }})();
  return {{ ok: true, value: value === undefined ? null : value }};
}} catch (e) {{
  return {{ ok: false, kind: (e && e.relist) || 'script', message: String((e && e.message) || e) }};
}}
}})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wrap_binds_args_and_body() {
        let script = wrap(QUERY_ALL, &json!({ "scope": null, "selector": "a[href=\"/x\"]" }));
        assert!(script.starts_with("(() => {"));
        assert!(script.contains(r#"const args = {"scope":null,"selector":"a[href=\"/x\"]"};"#));
        assert!(script.contains("queryAll(root, args.selector)"));
        assert!(script.trim_end().ends_with("})()"));
    }

    #[test]
    fn test_registry_drops_collected_elements() {
        let script = wrap(DESCRIBE, &json!({ "handle": 7 }));
        assert!(script.contains("if (ref && !el) R.els.delete(id);"));
        assert!(script.contains("if (R.els.size % 1024 === 0) sweep();"));
    }
}
