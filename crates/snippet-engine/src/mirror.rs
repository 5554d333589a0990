//! Primary selection and mirror propagation.

use log::{debug, trace};
use snippet_syntax::{Marker, NodeId, TabIndex};

use crate::error::SnippetError;
use crate::snippet::Snippet;

impl Snippet {
    /// Pick one primary placeholder for every non-zero index. Every `$0` is
    /// its own primary since final tab stops never mirror each other.
    pub(crate) fn assign_primaries(&mut self) {
        let mut groups: Vec<(TabIndex, Vec<NodeId>)> = Vec::new();
        for id in self.placeholders() {
            let Some(index) = self.tree.placeholder(id).map(|p| p.index) else {
                continue;
            };
            match groups.iter_mut().find(|(existing, _)| *existing == index) {
                Some((_, ids)) => ids.push(id),
                None => groups.push((index, vec![id])),
            }
        }

        for (index, ids) in groups {
            let primary = if index.is_final() {
                None
            } else {
                self.choose_primary(&ids)
            };
            for id in ids {
                let is_primary = primary.is_none_or(|primary| primary == id);
                if let Some(placeholder) = self
                    .tree
                    .marker_mut(id)
                    .and_then(|marker| marker.as_placeholder_mut())
                {
                    placeholder.primary = is_primary;
                }
            }
        }
    }

    fn choose_primary(&self, ids: &[NodeId]) -> Option<NodeId> {
        let marked: Vec<NodeId> = ids
            .iter()
            .copied()
            .filter(|id| self.tree.placeholder(*id).is_some_and(|p| p.primary))
            .collect();
        if let [only] = marked.as_slice() {
            return Some(*only);
        }
        let plain = |id: &&NodeId| {
            self.tree
                .placeholder(**id)
                .is_some_and(|p| p.transform.is_none())
        };
        ids.iter()
            .filter(plain)
            .find(|id| !self.tree.children(**id).is_empty())
            .or_else(|| ids.iter().find(plain))
            .or_else(|| ids.first())
            .copied()
    }

    /// Copy the primary's text into every mirror of its index, running each
    /// mirror's transform. Returns whether any mirror changed.
    ///
    /// Mirrors nested inside the primary are emptied, and mirrors that
    /// enclose the primary are left alone. A mirror showing a single text
    /// node has that node rewritten in place.
    pub(crate) fn sync_mirrors_of(&mut self, primary: NodeId) -> bool {
        if !self.tree.is_attached(primary) {
            return false;
        }
        let Some(index) = self.tree.placeholder(primary).map(|p| p.index) else {
            return false;
        };
        let text = self.tree.render(primary);

        let mut changed = false;
        for mirror in self.placeholders_with_index(index) {
            if mirror == primary || self.tree.is_ancestor_or_self(mirror, primary) {
                continue;
            }
            let value = if self.tree.is_ancestor_or_self(primary, mirror) {
                String::new()
            } else {
                match self
                    .tree
                    .placeholder(mirror)
                    .and_then(|p| p.transform.as_ref())
                {
                    Some(transform) => transform.resolve(&text),
                    None => text.clone(),
                }
            };
            if self.set_mirror_text(mirror, value) {
                changed = true;
            }
        }
        changed
    }

    /// Make `mirror` display exactly `value`. Returns whether it changed.
    fn set_mirror_text(&mut self, mirror: NodeId, value: String) -> bool {
        let children = self.tree.children(mirror).to_vec();
        match children.as_slice() {
            [] if value.is_empty() => false,
            [only] if !value.is_empty() => match self.tree.marker_mut(*only) {
                Some(Marker::Text(text)) if *text == value => false,
                Some(Marker::Text(text)) => {
                    *text = value;
                    true
                }
                _ => self.replace_mirror_children(mirror, value),
            },
            _ => self.replace_mirror_children(mirror, value),
        }
    }

    fn replace_mirror_children(&mut self, mirror: NodeId, value: String) -> bool {
        let children = if value.is_empty() {
            Vec::new()
        } else {
            vec![self.tree.new_text(value)]
        };
        match self.replace_and_release(mirror, children) {
            Ok(()) => true,
            Err(err) => {
                debug!("Failed to update mirror {mirror:?}: {err}");
                false
            }
        }
    }

    /// Synchronize every index until no mirror changes.
    ///
    /// A mirror may sit inside another index's primary, so one pass is not
    /// always enough. The number of passes is bounded by the placeholder
    /// count, which also stops self-referencing snippets from spinning.
    pub(crate) fn sync_all_mirrors(&mut self) {
        let passes = self.placeholders().len() + 1;
        for pass in 0..passes {
            let mut changed = false;
            for primary in self.primaries() {
                let is_final = self
                    .tree
                    .placeholder(primary)
                    .is_none_or(|p| p.is_final());
                if !is_final && self.sync_mirrors_of(primary) {
                    changed = true;
                }
            }
            if !changed {
                trace!("Mirrors settled after {} pass(es)", pass + 1);
                return;
            }
        }
    }

    /// Propagate the text of `primary` after the session edited it.
    pub fn on_placeholder_update(&mut self, primary: NodeId) -> Result<(), SnippetError> {
        let placeholder = self.expect_placeholder(primary)?;
        if !placeholder.primary {
            return Err(SnippetError::NotPrimary(primary));
        }
        self.sync_all_mirrors();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use snippet_syntax::{Dialect, parse};

    fn snippet(source: &str, dialect: Dialect) -> Snippet {
        Snippet::new(parse(source, dialect))
    }

    fn edit(snippet: &mut Snippet, index: u32, text: &str) {
        let primary = snippet.primary(TabIndex::new(index)).unwrap();
        let node = snippet.new_text(text);
        snippet.set_only_child(primary, node).unwrap();
        snippet.on_placeholder_update(primary).unwrap();
    }

    #[rstest]
    #[case("${1:foo} ${1/^(\\w)/\\u$1/}", Dialect::UltiSnips, "foo Foo")]
    #[case("${1:foo} ${1/^\\w/$0_/}", Dialect::UltiSnips, "foo f_oo")]
    #[case("${1:Foo} ${1/^(\\w+)$/\\u$1 (?1:-\\l$1)/g}", Dialect::UltiSnips, "Foo Foo -foo")]
    #[case("${1:a text}\n${1/\\w+\\s*/\\u$0/}", Dialect::UltiSnips, "a text\nA text")]
    #[case("${1:foo} ${1/^(f)(b?)/(?2:_:two)/}", Dialect::UltiSnips, "foo twooo")]
    #[case("${1:foo} ${1/^(f)/(?1:x\\)\\:a:two)/}", Dialect::UltiSnips, "foo x):aoo")]
    #[case("begin|${1:t}${1/(t)$|(a)$|(.*)/(?1:abular)(?2:rray)/}", Dialect::UltiSnips, "begin|tabular")]
    #[case("${1:pêche}\n${1/.*/$0/a}", Dialect::TextMate, "pêche\npeche")]
    #[case("${1/.*/$0/a}\n${1:pêche}", Dialect::TextMate, "peche\npêche")]
    #[case("${1}-abc-${1:foo}", Dialect::TextMate, "foo-abc-foo")]
    fn mirrors_follow_their_primary(
        #[case] source: &str,
        #[case] dialect: Dialect,
        #[case] expected: &str,
    ) {
        assert_eq!(snippet(source, dialect).to_string(), expected);
    }

    #[test]
    fn primary_prefers_a_default_without_transform() {
        let s = snippet("${1/a/b/} $1 ${1:x} ${1:y}", Dialect::TextMate);
        let primaries: Vec<String> = s.primaries().iter().map(|id| s.tree().source_of(*id)).collect();
        assert_eq!(primaries, vec!["${1:x}"]);
        assert_eq!(s.to_string(), " x x x");
    }

    #[test]
    fn every_final_tabstop_is_primary() {
        let s = snippet("$0 ${0:x} $0", Dialect::TextMate);
        assert_eq!(s.primaries().len(), 3);
        assert_eq!(s.to_string(), " x ");
    }

    #[test]
    fn editing_the_primary_updates_mirrors() {
        let mut s = snippet(
            "begin|${1:t}${1/(t)$|(a)$|(.*)/(?1:abular)(?2:rray)/}",
            Dialect::UltiSnips,
        );
        edit(&mut s, 1, "a");
        assert_eq!(s.to_string(), "begin|array");
        edit(&mut s, 1, "x");
        assert_eq!(s.to_string(), "begin|x");

        let mut s = snippet("${1:foo} ${1/^(f)(b?)/(?2:_:two)/}", Dialect::UltiSnips);
        edit(&mut s, 1, "fb");
        assert_eq!(s.to_string(), "fb _");
    }

    #[test]
    fn mirror_inside_another_primary_settles() {
        let mut s = snippet("${2:<$1>} ${1:a} $2", Dialect::TextMate);
        assert_eq!(s.to_string(), "<a> a <a>");
        edit(&mut s, 1, "bc");
        assert_eq!(s.to_string(), "<bc> bc <bc>");
    }

    #[test]
    fn self_nested_placeholder_does_not_loop() {
        let s = snippet("${1:${foo:${1}}}", Dialect::TextMate);
        assert_eq!(s.to_string(), "");
        let s = snippet("${1:a${1}b} $1", Dialect::TextMate);
        assert_eq!(s.to_string(), "ab ab");
    }

    #[test]
    fn update_rejects_mirrors_and_other_nodes() {
        let mut s = snippet("${1:a} $1", Dialect::TextMate);
        let [primary, mirror] = s.placeholders()[..] else {
            panic!("expected two placeholders");
        };
        assert_eq!(
            s.on_placeholder_update(mirror),
            Err(SnippetError::NotPrimary(mirror))
        );
        assert_eq!(s.on_placeholder_update(primary), Ok(()));
        let text = s.tree().children(s.root())[1];
        assert_eq!(
            s.on_placeholder_update(text),
            Err(SnippetError::NotAPlaceholder(text))
        );
    }

    #[test]
    fn repeated_edits_reuse_arena_slots() {
        let mut s = snippet("${1:a} $1 ${1/(.)/${1:/upcase}/} ${2:<$1>}", Dialect::TextMate);
        edit(&mut s, 1, "warm");
        let capacity = s.tree().capacity();
        let mirror_text = s.tree().children(s.placeholders()[1])[0];

        for round in 0..200 {
            edit(&mut s, 1, &format!("value {round}"));
        }
        assert_eq!(s.to_string(), "value 199 value 199 Value 199 <value 199>");
        assert!(s.tree().capacity() <= capacity + 1);
        assert_eq!(s.tree().children(s.placeholders()[1]), &[mirror_text]);

        edit(&mut s, 1, "");
        assert_eq!(s.to_string(), "   <>");
        edit(&mut s, 1, "b");
        assert_eq!(s.to_string(), "b b B <b>");
        assert!(s.tree().capacity() <= capacity + 1);
    }

    #[test]
    fn mirrors_agree_after_any_edit() {
        let mut s = snippet(
            "${1:one} ${1/(.)/${1:/upcase}/g} $1 ${2:two ${1}}",
            Dialect::TextMate,
        );
        for value in ["", "x", "hello world", "ünï"] {
            edit(&mut s, 1, value);
            let primary = s.primary(TabIndex::new(1)).unwrap();
            let text = s.render(primary);
            for mirror in s.placeholders_with_index(TabIndex::new(1)) {
                let expected = match s.placeholder(mirror).and_then(|p| p.transform.clone()) {
                    Some(transform) if mirror != primary => transform.resolve(&text),
                    _ => text.clone(),
                };
                assert_eq!(s.render(mirror), expected);
            }
        }
    }
}
