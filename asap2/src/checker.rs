use crate::{A2lError, specification::*};
use fnv::FnvHashSet;

// check the content of the tables and objects in every module
pub fn check(a2l_file: &A2lFile) -> Vec<A2lError> {
    let mut results = Vec::new();

    for module in a2l_file.project.module.iter_by_sequence() {
        for measurement in module.measurement.iter_by_sequence() {
            check_limits(
                "MEASUREMENT",
                &measurement.name,
                measurement.lower_limit,
                measurement.upper_limit,
                &mut results,
            );
        }

        for characteristic in module.characteristic.iter_by_sequence() {
            check_limits(
                "CHARACTERISTIC",
                &characteristic.name,
                characteristic.lower_limit,
                characteristic.upper_limit,
                &mut results,
            );
        }

        for compu_vtab in module.compu_vtab.iter_by_sequence() {
            check_compu_vtab(compu_vtab, &mut results);
        }

        for compu_vtab_range in module.compu_vtab_range.iter_by_sequence() {
            check_compu_vtab_range(compu_vtab_range, &mut results);
        }
    }

    results
}

fn check_limits(
    blockname: &str,
    item_name: &str,
    lower_limit: f64,
    upper_limit: f64,
    log_msgs: &mut Vec<A2lError>,
) {
    if lower_limit > upper_limit {
        log_msgs.push(A2lError::ContentError {
            item_name: item_name.to_string(),
            blockname: blockname.to_string(),
            description: format!(
                "the lower limit {lower_limit} is greater than the upper limit {upper_limit}"
            ),
        });
    }
}

fn check_compu_vtab(compu_vtab: &CompuVtab, log_msgs: &mut Vec<A2lError>) {
    if compu_vtab.number_value_pairs as usize != compu_vtab.entries.len() {
        log_msgs.push(A2lError::ContentError {
            item_name: compu_vtab.name.clone(),
            blockname: "COMPU_VTAB".to_string(),
            description: format!(
                "NumberValuePairs = {} but the table contains {} entries",
                compu_vtab.number_value_pairs,
                compu_vtab.entries.len()
            ),
        });
    }

    // -0.0 and 0.0 are the same input value
    let mut known_values = FnvHashSet::<u64>::default();
    for entry in &compu_vtab.entries {
        if !known_values.insert((entry.in_val + 0.0).to_bits()) {
            log_msgs.push(A2lError::ContentError {
                item_name: compu_vtab.name.clone(),
                blockname: "COMPU_VTAB".to_string(),
                description: format!("the input value {} is listed more than once", entry.in_val),
            });
        }
    }
}

fn check_compu_vtab_range(compu_vtab_range: &CompuVtabRange, log_msgs: &mut Vec<A2lError>) {
    if compu_vtab_range.number_value_triples as usize != compu_vtab_range.entries.len() {
        log_msgs.push(A2lError::ContentError {
            item_name: compu_vtab_range.name.clone(),
            blockname: "COMPU_VTAB_RANGE".to_string(),
            description: format!(
                "NumberValueTriples = {} but the table contains {} entries",
                compu_vtab_range.number_value_triples,
                compu_vtab_range.entries.len()
            ),
        });
    }

    for entry in &compu_vtab_range.entries {
        if entry.in_val_min > entry.in_val_max {
            log_msgs.push(A2lError::ContentError {
                item_name: compu_vtab_range.name.clone(),
                blockname: "COMPU_VTAB_RANGE".to_string(),
                description: format!(
                    "the range {} .. {} of \"{}\" is empty",
                    entry.in_val_min, entry.in_val_max, entry.out_val
                ),
            });
        }
    }
}

#[cfg(test)]
mod test {
    use crate::*;

    fn check_text(module_content: &str) -> Vec<A2lError> {
        let text = format!(
            "ASAP2_VERSION 1 71 /begin PROJECT p \"\" /begin MODULE m \"\"\n{module_content}\n/end MODULE /end PROJECT"
        );
        let (a2l, load_errors) = load_from_string(&text).unwrap();
        assert!(load_errors.is_empty());
        a2l.check()
    }

    #[test]
    fn check_compu_vtab() {
        // a consistent table
        let log_msgs = check_text(
            r#"/begin COMPU_VTAB tab "" TAB_VERB 2
                0 "off"
                1 "on"
            /end COMPU_VTAB"#,
        );
        assert!(log_msgs.is_empty());

        // NumberValuePairs does not match
        let log_msgs = check_text(
            r#"/begin COMPU_VTAB tab "" TAB_VERB 3
                0 "off"
                1 "on"
            /end COMPU_VTAB"#,
        );
        assert_eq!(log_msgs.len(), 1);
        let A2lError::ContentError {
            item_name,
            blockname,
            ..
        } = &log_msgs[0]
        else {
            panic!("expected a ContentError, got {:?}", log_msgs[0]);
        };
        assert_eq!(item_name, "tab");
        assert_eq!(blockname, "COMPU_VTAB");

        // the same input value occurs twice
        let log_msgs = check_text(
            r#"/begin COMPU_VTAB tab "" TAB_VERB 3
                0 "off"
                1 "on"
                1 "also on"
            /end COMPU_VTAB"#,
        );
        assert_eq!(log_msgs.len(), 1);
        assert!(log_msgs[0].to_string().contains("listed more than once"));
    }

    #[test]
    fn check_compu_vtab_range() {
        let log_msgs = check_text(
            r#"/begin COMPU_VTAB_RANGE range "" 2
                0 10 "low"
                11 20 "high"
            /end COMPU_VTAB_RANGE"#,
        );
        assert!(log_msgs.is_empty());

        let log_msgs = check_text(
            r#"/begin COMPU_VTAB_RANGE range "" 1
                0 10 "low"
                20 11 "high"
            /end COMPU_VTAB_RANGE"#,
        );
        // wrong count and one empty range
        assert_eq!(log_msgs.len(), 2);
    }

    #[test]
    fn check_limits() {
        let log_msgs = check_text(
            r#"/begin MEASUREMENT meas "" UBYTE NO_COMPU_METHOD 0 0 255 0
            /end MEASUREMENT
            /begin CHARACTERISTIC value "" VALUE 0x1000 rl 0 NO_COMPU_METHOD 0 100
            /end CHARACTERISTIC"#,
        );
        assert_eq!(log_msgs.len(), 1);
        let A2lError::ContentError { blockname, .. } = &log_msgs[0] else {
            panic!("expected a ContentError, got {:?}", log_msgs[0]);
        };
        assert_eq!(blockname, "MEASUREMENT");
    }

    #[test]
    fn check_constructed_data() {
        let mut a2l = new();
        let mut vtab = CompuVtab::new(
            &mut a2l.context,
            "vtab".to_string(),
            String::new(),
            ConversionType::TabVerb,
            2,
        );
        vtab.entries
            .push(VtabEntry::new(&mut a2l.context, 0.0, "zero".to_string()));
        vtab.entries
            .push(VtabEntry::new(&mut a2l.context, -0.0, "negative zero".to_string()));
        a2l.file.project.module[0].compu_vtab.push(vtab).unwrap();

        let log_msgs = a2l.check();
        assert_eq!(log_msgs.len(), 1);
    }
}
