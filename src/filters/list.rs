use std::sync::Arc;

use crate::registry::Source;

use super::mapping::FilterMapping;

/// The ordered master list of filter mappings.
///
/// The list is partitioned into three contiguous zones:
///
/// ```text
/// [0 ..= match_before]   programmatic prepends, in prepend-call order
/// (match_before .. match_after)   descriptor-declared, in load order
/// [match_after .. end]   programmatic appends, in append-call order
/// ```
///
/// `match_before_index` / `match_after_index` are `-1` while their zone
/// is empty. [`append`](FilterMappingList::append) and
/// [`prepend`](FilterMappingList::prepend) keep the partition intact:
/// a mapping whose source is the dynamic API lands in the outer zones,
/// everything else lands in the descriptor zone.
#[derive(Debug, Clone)]
pub struct FilterMappingList {
    mappings: Vec<Arc<FilterMapping>>,
    match_before_index: isize,
    match_after_index: isize,
}

impl Default for FilterMappingList {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterMappingList {
    pub fn new() -> Self {
        FilterMappingList {
            mappings: Vec::new(),
            match_before_index: -1,
            match_after_index: -1,
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// The mappings in effective order.
    pub fn mappings(&self) -> &[Arc<FilterMapping>] {
        &self.mappings
    }

    /// Index of the last programmatic prepend, or -1.
    pub fn match_before_index(&self) -> isize {
        self.match_before_index
    }

    /// Index of the first programmatic append, or -1.
    pub fn match_after_index(&self) -> isize {
        self.match_after_index
    }

    /// Add a mapping at the back of its zone: API-sourced mappings go
    /// to the end of the list (the append zone), everything else goes
    /// to the end of the descriptor zone, immediately before the
    /// append zone.
    pub fn append(&mut self, mapping: Arc<FilterMapping>) {
        if mapping.source() == Source::Api {
            self.mappings.push(mapping);
            if self.match_after_index < 0 {
                self.match_after_index = (self.mappings.len() - 1) as isize;
            }
        } else if self.match_after_index < 0 {
            self.mappings.push(mapping);
        } else {
            self.mappings.insert(self.match_after_index as usize, mapping);
            self.match_after_index += 1;
        }
    }

    /// Add a mapping at the front of its zone: API-sourced mappings go
    /// to the end of the prepend zone (so repeated prepends keep their
    /// call order), everything else goes to position 0.
    pub fn prepend(&mut self, mapping: Arc<FilterMapping>) {
        if mapping.source() == Source::Api {
            let pos = (self.match_before_index + 1) as usize;
            self.mappings.insert(pos, mapping);
            self.match_before_index += 1;
            if self.match_after_index >= 0 {
                self.match_after_index += 1;
            }
        } else {
            self.mappings.insert(0, mapping);
            if self.match_before_index >= 0 {
                self.match_before_index += 1;
            }
            if self.match_after_index >= 0 {
                self.match_after_index += 1;
            }
        }
    }

    /// Keep only mappings accepted by the predicate. Used at stop to
    /// purge mappings of de-registered filters; the zone indexes are
    /// reset to treat whatever remains as one trailing append zone.
    pub(crate) fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Arc<FilterMapping>) -> bool,
    {
        self.mappings.retain(keep);
        self.match_before_index = -1;
        self.match_after_index = if self.mappings.is_empty() {
            -1
        } else {
            (self.mappings.len() - 1) as isize
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::DispatchMask;

    fn mapping(name: &str, source: Source) -> Arc<FilterMapping> {
        Arc::new(
            FilterMapping::new(name, source)
                .with_dispatches(DispatchMask::ALL)
                .with_path_spec("/*")
                .unwrap(),
        )
    }

    fn names(list: &FilterMappingList) -> Vec<&str> {
        list.mappings().iter().map(|m| m.filter_name()).collect()
    }

    #[test]
    fn test_descriptor_appends_keep_load_order() {
        let mut list = FilterMappingList::new();
        list.append(mapping("d1", Source::Descriptor));
        list.append(mapping("d2", Source::Descriptor));
        list.append(mapping("d3", Source::Embedded));

        assert_eq!(names(&list), vec!["d1", "d2", "d3"]);
        assert_eq!(list.match_before_index(), -1);
        assert_eq!(list.match_after_index(), -1);
    }

    #[test]
    fn test_api_appends_stay_behind_descriptor_appends() {
        let mut list = FilterMappingList::new();
        list.append(mapping("a1", Source::Api));
        list.append(mapping("a2", Source::Api));
        list.append(mapping("d1", Source::Descriptor));
        list.append(mapping("d2", Source::Descriptor));

        assert_eq!(names(&list), vec!["d1", "d2", "a1", "a2"]);
        assert_eq!(list.match_after_index(), 2);
    }

    #[test]
    fn test_api_prepends_stay_before_descriptors_in_call_order() {
        let mut list = FilterMappingList::new();
        list.append(mapping("d1", Source::Descriptor));
        list.prepend(mapping("p1", Source::Api));
        list.prepend(mapping("p2", Source::Api));

        assert_eq!(names(&list), vec!["p1", "p2", "d1"]);
        assert_eq!(list.match_before_index(), 1);
    }

    #[test]
    fn test_three_zones() {
        let mut list = FilterMappingList::new();
        list.append(mapping("d1", Source::Descriptor));
        list.prepend(mapping("p1", Source::Api));
        list.append(mapping("a1", Source::Api));
        list.append(mapping("d2", Source::Descriptor));
        list.prepend(mapping("p2", Source::Api));
        list.append(mapping("a2", Source::Api));

        assert_eq!(names(&list), vec!["p1", "p2", "d1", "d2", "a1", "a2"]);
        assert_eq!(list.match_before_index(), 1);
        assert_eq!(list.match_after_index(), 4);
    }

    #[test]
    fn test_zones_contiguous_under_interleaving() {
        let mut list = FilterMappingList::new();
        let calls: &[(&str, Source, bool)] = &[
            ("a1", Source::Api, false),
            ("d1", Source::Descriptor, false),
            ("p1", Source::Api, true),
            ("d2", Source::Descriptor, false),
            ("a2", Source::Api, false),
            ("p2", Source::Api, true),
            ("d3", Source::Embedded, false),
        ];
        for (name, source, is_prepend) in calls {
            let m = mapping(name, *source);
            if *is_prepend {
                list.prepend(m);
            } else {
                list.append(m);
            }
        }

        assert_eq!(
            names(&list),
            vec!["p1", "p2", "d1", "d2", "d3", "a1", "a2"]
        );
        assert_eq!(list.match_before_index(), 1);
        assert_eq!(list.match_after_index(), 5);
    }

    #[test]
    fn test_retain_resets_zone_indexes() {
        let mut list = FilterMappingList::new();
        list.append(mapping("d1", Source::Descriptor));
        list.prepend(mapping("p1", Source::Api));
        list.append(mapping("e1", Source::Embedded));

        list.retain(|m| m.source() == Source::Embedded);

        assert_eq!(names(&list), vec!["e1"]);
        assert_eq!(list.match_before_index(), -1);
        assert_eq!(list.match_after_index(), 0);
    }
}
