//! Structural equality over realized values, with cycle-breaking
//! (`spec.md` §4.9, §9). Used by `CallDriver` to decide whether a mutable
//! argument actually changed between entry and exit.

use super::value::RealizedValue;

/// `deep_eq(a, b)`: structural equality that breaks cycles by identity of
/// already-visited pairs rather than recursing forever.
///
/// `spec.md` §9 flags a known bug in the original's map comparison: it built
/// its key union from `old_val.keys()` plus *`new_val.values()`* (chaining
/// the wrong dict's values instead of its keys), so a key added only in
/// `new_val` whose value lives at an index past `old_val`'s key count could
/// be skipped. Resolved here (Open Question, see `DESIGN.md`) by using the
/// union of both dicts' actual *keys*, which is what an equality check
/// obviously needs, with a regression test pinning the fix.
pub fn deep_eq(a: &RealizedValue, b: &RealizedValue) -> bool {
    deep_eq_visiting(a, b, &mut Vec::new())
}

fn deep_eq_visiting(a: &RealizedValue, b: &RealizedValue, visiting: &mut Vec<(usize, usize)>) -> bool {
    let key = (a as *const _ as usize, b as *const _ as usize);
    if visiting.contains(&key) {
        return true;
    }
    visiting.push(key);
    let result = match (a, b) {
        (RealizedValue::Bool(x), RealizedValue::Bool(y)) => x == y,
        (RealizedValue::Int(x), RealizedValue::Int(y)) => x == y,
        (RealizedValue::Float(x), RealizedValue::Float(y)) => x == y,
        (RealizedValue::Str(x), RealizedValue::Str(y)) => x == y,
        (RealizedValue::Void, RealizedValue::Void) => true,
        (RealizedValue::Type(x), RealizedValue::Type(y)) => x == y,
        (RealizedValue::Callable(x), RealizedValue::Callable(y)) => x == y,
        (RealizedValue::List(xs), RealizedValue::List(ys))
        | (RealizedValue::Tuple(xs), RealizedValue::Tuple(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| deep_eq_visiting(x, y, visiting))
        }
        (RealizedValue::Set(xs), RealizedValue::Set(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|x| ys.iter().any(|y| deep_eq_visiting(x, y, visiting)))
        }
        (RealizedValue::Map(xs), RealizedValue::Map(ys)) => deep_eq_maps(xs, ys, visiting),
        (RealizedValue::Class { name: n1, fields: f1 }, RealizedValue::Class { name: n2, fields: f2 }) => {
            n1 == n2
                && f1.len() == f2.len()
                && f1.iter().all(|(k, v)| {
                    f2.iter()
                        .find(|(k2, _)| k2 == k)
                        .is_some_and(|(_, v2)| deep_eq_visiting(v, v2, visiting))
                })
        }
        (RealizedValue::Enum { type_name: n1, variant: v1 }, RealizedValue::Enum { type_name: n2, variant: v2 }) => {
            n1 == n2 && v1 == v2
        }
        (RealizedValue::Unrepresentable, RealizedValue::Unrepresentable) => false,
        _ => false,
    };
    visiting.pop();
    result
}

/// Map comparison by the union of both sides' keys — the corrected version
/// of the original's `old_val.keys()` + `new_val.values()` bug (`spec.md`
/// §9).
fn deep_eq_maps(
    xs: &[(RealizedValue, RealizedValue)],
    ys: &[(RealizedValue, RealizedValue)],
    visiting: &mut Vec<(usize, usize)>,
) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    let lookup = |pairs: &[(RealizedValue, RealizedValue)], key: &RealizedValue| -> Option<usize> {
        pairs.iter().position(|(k, _)| deep_eq_visiting(k, key, &mut Vec::new()))
    };
    let all_keys = xs.iter().map(|(k, _)| k).chain(ys.iter().map(|(k, _)| k));
    let mut seen: Vec<&RealizedValue> = Vec::new();
    for key in all_keys {
        if seen.iter().any(|k| deep_eq_visiting(k, key, &mut Vec::new())) {
            continue;
        }
        seen.push(key);
        let xi = lookup(xs, key);
        let yi = lookup(ys, key);
        match (xi, yi) {
            (Some(i), Some(j)) => {
                if !deep_eq_visiting(&xs[i].1, &ys[j].1, visiting) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}
