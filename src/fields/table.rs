//! Field table: schema tracking, enable state and shortcut ownership
//!
//! The table is the only owner of [`Field`] and [`Group`] records. Incoming
//! lines are compared against the current schema; any difference rebuilds
//! every field before the line's values are applied.

use super::{Field, FieldSpec, Group, ShortcutSpec};
use crate::data::ParsedLine;
use crate::shortcuts::{self, AssignOptions, ShortcutExhaustion};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Result of ingesting one parsed line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestOutcome {
    /// The label sequence differed from the previous one
    pub schema_changed: bool,
}

/// Report of a shortcut toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggled {
    pub name: String,
    pub is_group: bool,
    pub enabled: bool,
}

/// Enabled flags by name, as saved between sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledStates {
    #[serde(default)]
    pub groups: BTreeMap<String, bool>,
    #[serde(default)]
    pub fields: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Field(usize),
    Group(usize),
}

/// Owner of every field and group record
#[derive(Debug)]
pub struct FieldTable {
    spec: FieldSpec,
    fields: Vec<Field>,
    groups: Vec<Group>,
    window: usize,
    /// Last known enabled flag of fields, kept across rebuilds
    remembered: HashMap<String, bool>,
    /// Field names seeded by [`restore_states`](Self::restore_states)
    restored: HashSet<String>,
    shortcuts: HashMap<char, Target>,
}

impl FieldTable {
    pub fn new(spec: FieldSpec, window: usize) -> Self {
        let groups = spec.groups.iter().map(Group::from_spec).collect();
        Self {
            spec,
            fields: Vec::new(),
            groups,
            window: window.max(1),
            remembered: HashMap::new(),
            restored: HashSet::new(),
            shortcuts: HashMap::new(),
        }
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Current field names in schema order
    pub fn schema(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Fields shown in the legend
    pub fn visible(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|f| f.is_visible())
    }

    /// Fields drawn on the plot and used for autoranging
    pub fn plotted(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|f| f.is_plotted())
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Change the history capacity, trimming existing histories
    pub fn set_window(&mut self, window: usize) {
        self.window = window.max(1);
        for field in &mut self.fields {
            while field.history.len() > self.window {
                field.history.pop_front();
            }
        }
    }

    /// Apply one parsed line, rebuilding the schema first if its labels differ.
    pub fn ingest(&mut self, line: &ParsedLine) -> IngestOutcome {
        let labels: Vec<&str> = line.labels().collect();
        let changed = labels.len() != self.fields.len()
            || labels
                .iter()
                .zip(&self.fields)
                .any(|(label, field)| *label != field.name);

        if changed {
            info!(
                "schema changed: [{}] -> [{}]",
                self.schema().join(", "),
                labels.join(", ")
            );
            self.rebuild(&labels);
        }

        for (field, sample) in self.fields.iter_mut().zip(&line.samples) {
            field.push_sample(sample.value, self.window);
        }

        IngestOutcome {
            schema_changed: changed,
        }
    }

    /// Replace every field record with fresh ones for `names`.
    ///
    /// Values start at zero with empty history. Enabled flags come from the
    /// last known state of the same name, else the fieldspec default.
    pub fn rebuild(&mut self, names: &[&str]) {
        for field in self.fields.iter().filter(|f| !f.hidden) {
            self.remembered.insert(field.name.clone(), field.enabled);
        }
        // Keep declared names, the outgoing and incoming schema, and names
        // seeded from a saved session. Anything else was line noise.
        let outgoing: HashSet<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        let spec = &self.spec;
        let restored = &self.restored;
        self.remembered.retain(|name, _| {
            spec.field(name).is_some()
                || outgoing.contains(name.as_str())
                || names.contains(&name.as_str())
                || restored.contains(name)
        });

        self.fields = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let mut field = Field::new(name, index, self.spec.field(name));
                field.enabled = self
                    .remembered
                    .get(*name)
                    .copied()
                    .unwrap_or_else(|| self.spec.initial_state(name));
                field
            })
            .collect();
        self.shortcuts.clear();
    }

    /// Push each group's enabled flag onto its member fields, lowest order
    /// first, so the highest-ordered group containing a field wins.
    pub fn resolve_groups(&mut self) {
        let mut order: Vec<usize> = (0..self.groups.len()).collect();
        order.sort_by_key(|&i| self.groups[i].sort_order());

        for i in order {
            let group = &self.groups[i];
            for field in self.fields.iter_mut().filter(|f| !f.hidden) {
                if field.groups.contains(&group.name) {
                    field.enabled = group.enabled;
                }
            }
        }
    }

    /// Give every visible field and every group a shortcut.
    ///
    /// Fields go first with the reserved keys and every fixed key of the
    /// fieldspec excluded; groups follow with every key the fields received
    /// excluded as well. The conflict pause runs at most once per call.
    pub fn assign_shortcuts(
        &mut self,
        reserved: &HashSet<char>,
        options: &AssignOptions,
    ) -> Option<ShortcutExhaustion> {
        let mut field_names = Vec::new();
        let mut field_manual = BTreeMap::new();
        for field in self.fields.iter().filter(|f| f.is_visible()) {
            match self.spec.field_key(&field.name) {
                ShortcutSpec::Auto => field_names.push(field.name.clone()),
                ShortcutSpec::Fixed(key) => {
                    field_manual.insert(field.name.clone(), key);
                }
                ShortcutSpec::Disabled => {}
            }
        }

        let mut group_names = Vec::new();
        let mut group_manual = BTreeMap::new();
        for group in &self.spec.groups {
            match group.key {
                ShortcutSpec::Auto => group_names.push(group.name.clone()),
                ShortcutSpec::Fixed(key) => {
                    group_manual.insert(group.name.clone(), key);
                }
                ShortcutSpec::Disabled => {}
            }
        }

        // Fixed keys of declared fields that are not on screen yet stay
        // reserved for them.
        let pending_fixed: HashSet<char> = self
            .spec
            .fields
            .values()
            .filter(|def| !field_manual.contains_key(&def.name))
            .filter_map(|def| match def.key {
                ShortcutSpec::Fixed(key) => Some(key),
                _ => None,
            })
            .collect();

        let mut field_exclude = reserved.clone();
        field_exclude.extend(group_manual.values().copied());
        field_exclude.extend(&pending_fixed);
        let field_keys = shortcuts::assign(&field_names, &field_exclude, &field_manual, options);

        let mut group_exclude = reserved.clone();
        group_exclude.extend(field_keys.used_keys());
        group_exclude.extend(&pending_fixed);
        let group_options = if field_keys.conflicts.is_empty() {
            options.clone()
        } else {
            AssignOptions::immediate()
        };
        let group_keys =
            shortcuts::assign(&group_names, &group_exclude, &group_manual, &group_options);

        self.shortcuts.clear();
        for (i, field) in self.fields.iter_mut().enumerate() {
            field.shortcut = if field.hidden {
                None
            } else {
                field_keys.get(&field.name)
            };
            if let Some(key) = field.shortcut {
                self.shortcuts.insert(key, Target::Field(i));
            }
        }
        for (i, group) in self.groups.iter_mut().enumerate() {
            group.shortcut = group_keys.get(&group.name);
            if let Some(key) = group.shortcut {
                self.shortcuts.insert(key, Target::Group(i));
            }
        }
        debug!("{} shortcuts active", self.shortcuts.len());

        let mut unassigned: Vec<String> = Vec::new();
        for exhaustion in [field_keys.exhausted, group_keys.exhausted]
            .into_iter()
            .flatten()
        {
            unassigned.extend(exhaustion.names);
        }
        (!unassigned.is_empty()).then_some(ShortcutExhaustion { names: unassigned })
    }

    /// Flip the field or group bound to `key`.
    ///
    /// Group toggles change only the group's own flag; member fields follow
    /// at the next [`resolve_groups`](Self::resolve_groups).
    pub fn toggle_key(&mut self, key: char) -> Option<Toggled> {
        match *self.shortcuts.get(&key)? {
            Target::Field(i) => {
                let field = self.fields.get_mut(i)?;
                field.enabled = !field.enabled;
                self.remembered.insert(field.name.clone(), field.enabled);
                Some(Toggled {
                    name: field.name.clone(),
                    is_group: false,
                    enabled: field.enabled,
                })
            }
            Target::Group(i) => {
                let group = self.groups.get_mut(i)?;
                group.enabled = !group.enabled;
                Some(Toggled {
                    name: group.name.clone(),
                    is_group: true,
                    enabled: group.enabled,
                })
            }
        }
    }

    /// Enabled flags of every group, every declared field and every field
    /// in the current schema
    pub fn snapshot_states(&self) -> EnabledStates {
        let mut fields: BTreeMap<String, bool> = self
            .remembered
            .iter()
            .filter(|(name, _)| self.spec.field(name).is_some_and(|def| !def.hidden))
            .map(|(name, enabled)| (name.clone(), *enabled))
            .collect();
        for field in self.fields.iter().filter(|f| !f.hidden) {
            fields.insert(field.name.clone(), field.enabled);
        }
        EnabledStates {
            groups: self
                .groups
                .iter()
                .map(|g| (g.name.clone(), g.enabled))
                .collect(),
            fields,
        }
    }

    /// Seed enabled flags from a saved session. Unknown groups are ignored;
    /// field flags apply now and whenever the field reappears.
    pub fn restore_states(&mut self, states: &EnabledStates) {
        for group in &mut self.groups {
            if let Some(&enabled) = states.groups.get(&group.name) {
                group.enabled = enabled;
            }
        }
        for (name, &enabled) in &states.fields {
            self.remembered.insert(name.clone(), enabled);
            self.restored.insert(name.clone());
        }
        for field in &mut self.fields {
            if let Some(&enabled) = states.fields.get(&field.name) {
                field.enabled = enabled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_line;

    fn table(spec_toml: &str) -> FieldTable {
        FieldTable::new(FieldSpec::from_toml(spec_toml).expect("spec"), 200)
    }

    fn feed(table: &mut FieldTable, line: &str) -> IngestOutcome {
        table.ingest(&parse_line(line).expect("line parses"))
    }

    fn reserved() -> HashSet<char> {
        ['q', '#'].into_iter().collect()
    }

    #[test]
    fn stable_schema_accumulates_history() {
        let mut t = table("");
        assert!(feed(&mut t, "temp:23.4\thumidity:67.2").schema_changed);
        assert!(!feed(&mut t, "temp:24.0\thumidity:68.0").schema_changed);

        assert_eq!(t.schema(), vec!["temp", "humidity"]);
        let temp = t.field("temp").unwrap();
        assert_eq!(temp.history, [23.4, 24.0]);
        assert_eq!(temp.value, 24.0);
        assert_eq!(t.field("humidity").unwrap().history, [67.2, 68.0]);
    }

    #[test]
    fn count_change_resets_every_history() {
        let mut t = table("");
        feed(&mut t, "a:1\tb:2");
        feed(&mut t, "a:3\tb:4");
        assert!(feed(&mut t, "a:5\tb:6\tc:7").schema_changed);
        for field in t.fields() {
            assert_eq!(field.history.len(), 1);
        }
        assert_eq!(t.field("a").unwrap().history, [5.0]);
    }

    #[test]
    fn renamed_label_is_a_schema_change() {
        let mut t = table("");
        feed(&mut t, "a:1\tb:2");
        assert!(feed(&mut t, "a:1\tc:2").schema_changed);
        assert_eq!(t.schema(), vec!["a", "c"]);
    }

    #[test]
    fn bare_numbers_use_positions() {
        let mut t = table("");
        feed(&mut t, "1.5\t-2");
        assert_eq!(t.schema(), vec!["1", "2"]);
        assert_eq!(t.field("2").unwrap().value, -2.0);
    }

    #[test]
    fn history_respects_window() {
        let mut t = FieldTable::new(FieldSpec::empty(), 3);
        for v in 0..6 {
            feed(&mut t, &format!("x:{v}"));
        }
        assert_eq!(t.field("x").unwrap().history, [3.0, 4.0, 5.0]);
        t.set_window(1);
        assert_eq!(t.field("x").unwrap().history, [5.0]);
    }

    #[test]
    fn highest_ordered_group_wins() {
        let mut t = table(
            r#"
[groups.A]
order = 1
state = true
[groups.B]
order = 2
state = false
[fields.f]
groups = ["A", "B"]
"#,
        );
        feed(&mut t, "f:1\tg:2");
        t.resolve_groups();
        assert!(!t.field("f").unwrap().enabled);
        assert!(t.field("g").unwrap().enabled);
    }

    #[test]
    fn unordered_group_applies_last() {
        let mut t = table(
            r#"
[groups.late]
state = true
[groups.early]
order = 5
state = false
[fields.f]
groups = ["early", "late"]
"#,
        );
        feed(&mut t, "f:1");
        t.resolve_groups();
        assert!(t.field("f").unwrap().enabled);
    }

    #[test]
    fn global_start_state_applies_to_new_fields() {
        let mut t = table("[state]\nstart = false\n[fields.on]\nstate = true");
        feed(&mut t, "on:1\toff:2");
        assert!(t.field("on").unwrap().enabled);
        assert!(!t.field("off").unwrap().enabled);
    }

    #[test]
    fn shortcuts_are_globally_distinct() {
        let mut t = table(
            r#"
[groups.power]
key = "p"
[groups.thermal]
[fields.volts]
groups = ["power"]
key = "v"
[fields.seq]
hidden = true
"#,
        );
        feed(&mut t, "volts:1\tpressure:2\ttemp:3\tseq:4");
        let exhausted = t.assign_shortcuts(&reserved(), &AssignOptions::immediate());
        assert!(exhausted.is_none());

        assert_eq!(t.field("volts").unwrap().shortcut, Some('v'));
        assert_eq!(t.group("power").unwrap().shortcut, Some('p'));
        assert_eq!(t.field("seq").unwrap().shortcut, None);

        let mut keys: Vec<char> = t
            .fields()
            .iter()
            .filter_map(|f| f.shortcut)
            .chain(t.groups().iter().filter_map(|g| g.shortcut))
            .collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(total, 5);
        assert!(keys.iter().all(|k| !reserved().contains(k)));
        assert_ne!(t.field("pressure").unwrap().shortcut, Some('p'));
    }

    #[test]
    fn disabled_key_gets_no_shortcut() {
        let mut t = table("[fields.x]\nkey = \"none\"");
        feed(&mut t, "x:1\ty:2");
        t.assign_shortcuts(&reserved(), &AssignOptions::immediate());
        assert_eq!(t.field("x").unwrap().shortcut, None);
        assert!(t.field("y").unwrap().shortcut.is_some());
    }

    #[test]
    fn toggle_flips_field_and_group() {
        let mut t = table("[groups.g]\nkey = \"G\"\n[fields.a]\ngroups = [\"g\"]\nkey = \"a\"");
        feed(&mut t, "a:1\tb:2");
        t.assign_shortcuts(&reserved(), &AssignOptions::immediate());

        let toggled = t.toggle_key('a').expect("field toggle");
        assert_eq!(
            toggled,
            Toggled {
                name: "a".into(),
                is_group: false,
                enabled: false
            }
        );
        assert!(!t.field("a").unwrap().enabled);

        let toggled = t.toggle_key('G').expect("group toggle");
        assert!(toggled.is_group);
        assert!(!t.group("g").unwrap().enabled);
        // member follows only at the next resolution pass
        t.toggle_key('a');
        assert!(t.field("a").unwrap().enabled);
        t.resolve_groups();
        assert!(!t.field("a").unwrap().enabled);

        assert_eq!(t.toggle_key('Z'), None);
    }

    #[test]
    fn enabled_state_survives_rebuild() {
        let mut t = table("[fields.a]\nkey = \"a\"");
        feed(&mut t, "a:1");
        t.assign_shortcuts(&reserved(), &AssignOptions::immediate());
        t.toggle_key('a');
        feed(&mut t, "a:1\tb:2");
        assert!(!t.field("a").unwrap().enabled);
        assert!(t.field("b").unwrap().enabled);
    }

    #[test]
    fn rebuild_clears_stale_shortcuts() {
        let mut t = table("");
        feed(&mut t, "a:1");
        t.assign_shortcuts(&reserved(), &AssignOptions::immediate());
        feed(&mut t, "b:1");
        assert_eq!(t.toggle_key('a'), None);
    }

    #[test]
    fn snapshot_and_restore() {
        let mut t = table("[groups.g]\n[fields.a]\ngroups = [\"g\"]");
        feed(&mut t, "a:1\tb:2");
        let mut states = t.snapshot_states();
        assert_eq!(states.groups.get("g"), Some(&true));
        assert_eq!(states.fields.get("b"), Some(&true));

        states.groups.insert("g".into(), false);
        states.fields.insert("b".into(), false);
        states.fields.insert("later".into(), false);

        let mut fresh = table("[groups.g]\n[fields.a]\ngroups = [\"g\"]");
        fresh.restore_states(&states);
        feed(&mut fresh, "a:1\tb:2\tlater:3");
        fresh.resolve_groups();
        assert!(!fresh.group("g").unwrap().enabled);
        assert!(!fresh.field("a").unwrap().enabled);
        assert!(!fresh.field("b").unwrap().enabled);
        assert!(!fresh.field("later").unwrap().enabled);
    }

    #[test]
    fn declared_keys_stay_reserved_until_their_field_appears() {
        let mut t = table("[fields.late]\nkey = \"a\"");
        feed(&mut t, "alpha:1");
        t.assign_shortcuts(&reserved(), &AssignOptions::immediate());
        let alpha = t.field("alpha").unwrap().shortcut;
        assert!(alpha.is_some());
        assert_ne!(alpha, Some('a'));

        feed(&mut t, "alpha:1\tlate:2");
        let exhausted = t.assign_shortcuts(&reserved(), &AssignOptions::immediate());
        assert!(exhausted.is_none());
        assert_eq!(t.field("alpha").unwrap().shortcut, alpha);
        assert_eq!(t.field("late").unwrap().shortcut, Some('a'));
    }

    #[test]
    fn noisy_labels_are_forgotten() {
        let mut t = table("[fields.temp]\nstate = true");
        feed(&mut t, "temp:1");
        for i in 0..50 {
            feed(&mut t, &format!("temp:1\tte{i}:2"));
        }
        feed(&mut t, "temp:1\thum:2");
        feed(&mut t, "temp:1\thum:2");

        let states = t.snapshot_states();
        let names: Vec<&str> = states.fields.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["hum", "temp"]);
        assert!(t.remembered.len() <= 3);
    }

    #[test]
    fn restored_names_survive_unrelated_schemas() {
        let mut t = table("");
        let mut states = EnabledStates::default();
        states.fields.insert("later".into(), false);
        t.restore_states(&states);

        feed(&mut t, "a:1");
        feed(&mut t, "b:1");
        feed(&mut t, "later:1");
        assert!(!t.field("later").unwrap().enabled);
    }

    #[test]
    fn hidden_fields_are_never_plotted() {
        let mut t = table("[fields.seq]\nhidden = true");
        feed(&mut t, "seq:1\tv:2");
        assert_eq!(t.plotted().count(), 1);
        assert_eq!(t.visible().count(), 1);
        assert!(!t.snapshot_states().fields.contains_key("seq"));
    }
}
