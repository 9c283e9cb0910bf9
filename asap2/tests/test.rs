#[cfg(test)]
mod test {
    use asap2::*;
    use tempfile::tempdir;

    const TEST_A2L: &str = r###"ASAP2_VERSION 1 71
A2ML_VERSION 1 31
/begin PROJECT SOMETHING ""
  /begin HEADER "header comment"
    VERSION "1.0"
    PROJECT_NO P1234
  /end HEADER
  /begin MODULE CPP ""
    /begin A2ML block "IF_DATA" struct { uint; };
    /end A2ML
    /begin IF_DATA XCP 0x10 INTERN
    /end IF_DATA
    /begin MOD_COMMON ""
      ALIGNMENT_BYTE 1
      ALIGNMENT_WORD 2
      BYTE_ORDER MSB_LAST
      DATA_SIZE 16
    /end MOD_COMMON
    /begin MOD_PAR "mod par"
      ADDR_EPK 0x145678
      /begin CALIBRATION_METHOD "InCircuit" 2
        /begin CALIBRATION_HANDLE
          0x10000
          0x200
          CALIBRATION_HANDLE_TEXT "handle"
        /end CALIBRATION_HANDLE
      /end CALIBRATION_METHOD
      CPU_TYPE "cpu"
      /begin MEMORY_SEGMENT Data "" DATA FLASH INTERN 0x1000 0x200 -1 -1 -1 -1 -1
      /end MEMORY_SEGMENT
      SYSTEM_CONSTANT "A" "1"
      SYSTEM_CONSTANT "B" "2"
      VERSION "v1"
    /end MOD_PAR
    /begin MEASUREMENT RPM "engine speed" UWORD NO_COMPU_METHOD 1 0 0 6000
      ECU_ADDRESS 0x1234
      BIT_MASK 0xFF00
      /begin BIT_OPERATION
        RIGHT_SHIFT 4
        SIGN_EXTEND
      /end BIT_OPERATION
      /begin ANNOTATION
        ANNOTATION_LABEL "label"
        /begin ANNOTATION_TEXT
          "line 1"
          "line 2"
        /end ANNOTATION_TEXT
      /end ANNOTATION
      READ_WRITE
      /begin IF_DATA XCP 0x1
      /end IF_DATA
    /end MEASUREMENT
    /begin MEASUREMENT ANGLE "" SWORD NO_COMPU_METHOD 1 0.5 -180 180
    /end MEASUREMENT
    /begin CHARACTERISTIC KL "curve" CURVE 0x2000 RL 0 NO_COMPU_METHOD -10 10.5
      BYTE_ORDER MSB_FIRST
      CALIBRATION_ACCESS CALIBRATION
      FORMAT "%6.2"
      MATRIX_DIM 2 3 1
      NUMBER 6
      READ_ONLY
    /end CHARACTERISTIC
    /begin COMPU_VTAB TAB "states" TAB_VERB 2
      0 "off"
      1 "on"
      DEFAULT_VALUE "unknown"
    /end COMPU_VTAB
    /begin COMPU_VTAB_RANGE RANGE "" 2
      0 10 "low"
      10.5 20 "high"
    /end COMPU_VTAB_RANGE
  /end MODULE
/end PROJECT
"###;

    fn measurement(context: &mut BuildContext, name: &str) -> Measurement {
        Measurement::new(
            context,
            name.to_string(),
            String::new(),
            DataType::Uword,
            "NO_COMPU_METHOD".to_string(),
            1,
            0.0,
            0.0,
            6000.0,
        )
    }

    #[test]
    fn round_trip() {
        let (a2l, log_msgs) = asap2::load_from_string(TEST_A2L).unwrap();
        assert!(log_msgs.is_empty());
        let text = a2l.write_to_string().unwrap();
        println!("input:\n{}\noutput:\n{}\n", TEST_A2L, text);

        assert_eq!(TEST_A2L, text);

        // decoding the output again gives an equal document
        let (a2l_2, _) = asap2::load_from_string(&text).unwrap();
        assert_eq!(a2l.file, a2l_2.file);
    }

    #[test]
    fn loaded_content() {
        let (a2l, _) = asap2::load_from_string(TEST_A2L).unwrap();
        let module = &a2l.file.project.module[0];
        assert_eq!(module.get_name(), "CPP");
        assert_eq!(a2l.file.a2ml_version.as_ref().unwrap().upgrade_no, 31);

        let header = a2l.file.project.header.as_ref().unwrap();
        assert_eq!(header.version.as_deref(), Some("1.0"));
        assert_eq!(header.project_no.as_deref(), Some("P1234"));

        assert_eq!(module.if_data.get("XCP").unwrap().data, "XCP 0x10 INTERN");
        assert_eq!(module.a2ml.len(), 1);

        let mod_common = module.mod_common.as_ref().unwrap();
        assert_eq!(mod_common.alignment.len(), 2);
        assert_eq!(mod_common.alignment.get("ALIGNMENT_WORD").unwrap().border, 2);
        assert_eq!(
            mod_common.byte_order.as_ref().unwrap().value,
            ByteOrderEnum::MsbLast
        );
        assert_eq!(mod_common.data_size, Some(16));

        let mod_par = module.mod_par.as_ref().unwrap();
        assert_eq!(mod_par.addr_epk[0].address, 0x145678);
        let handle = mod_par.calibration_method[0]
            .calibration_handle
            .as_ref()
            .unwrap();
        assert_eq!(handle.handles, vec![0x10000, 0x200]);
        assert_eq!(mod_par.memory_segment[0].prg_type, PrgType::Data);
        assert_eq!(mod_par.memory_segment[0].offset_4, -1);
        assert_eq!(mod_par.system_constant.get("B").unwrap().value, "2");

        let rpm = module.measurement.get("RPM").unwrap();
        assert_eq!(rpm.datatype, DataType::Uword);
        assert_eq!(rpm.upper_limit, 6000.0);
        assert!(rpm.read_write);
        let bit_operation = rpm.bit_operation.as_ref().unwrap();
        assert_eq!(bit_operation.right_shift.as_ref().unwrap().bitcount, 4);
        assert!(bit_operation.left_shift.is_none());
        assert!(bit_operation.sign_extend);
        let annotation_text = rpm
            .annotation
            .as_ref()
            .unwrap()
            .annotation_text
            .as_ref()
            .unwrap();
        assert_eq!(annotation_text.text, vec!["line 1", "line 2"]);

        let characteristic = module.characteristic.get("KL").unwrap();
        assert_eq!(characteristic.characteristic_type, CharacteristicType::Curve);
        assert_eq!(characteristic.lower_limit, -10.0);
        assert_eq!(characteristic.number, Some(6));
        assert!(characteristic.read_only);

        let vtab = module.compu_vtab.get("TAB").unwrap();
        assert_eq!(vtab.entries.len(), 2);
        assert_eq!(vtab.entries[1].in_val, 1.0);
        assert_eq!(vtab.entries[1].out_val, "on");
        assert_eq!(vtab.default_value.as_deref(), Some("unknown"));

        let range = module.compu_vtab_range.get("RANGE").unwrap();
        assert_eq!(range.entries[1].in_val_min, 10.5);
    }

    #[test]
    fn dictionary_order() {
        // the order of the file is kept
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
          /begin MODULE m ""
            /begin MEASUREMENT B "" UBYTE NO_COMPU_METHOD 1 0 0 255 /end MEASUREMENT
            /begin MEASUREMENT A "" UBYTE NO_COMPU_METHOD 1 0 0 255 /end MEASUREMENT
          /end MODULE
        /end PROJECT"#;
        let (mut a2l, _) = asap2::load_from_string(text).unwrap();

        // a measurement that is created later is written after the existing ones, even if it
        // displaces an existing element in the storage of the list
        let module = &mut a2l.file.project.module[0];
        let meas_b = module.measurement.swap_remove("B").unwrap();
        module
            .measurement
            .push(measurement(&mut a2l.context, "C"))
            .unwrap();
        module.measurement.push(meas_b).unwrap();

        let output = a2l.write_to_string().unwrap();
        let pos_a = output.find("MEASUREMENT A ").unwrap();
        let pos_b = output.find("MEASUREMENT B ").unwrap();
        let pos_c = output.find("MEASUREMENT C ").unwrap();
        assert!(pos_b < pos_a && pos_a < pos_c);
    }

    #[test]
    fn hex_values() {
        let mut context = BuildContext::new();
        let address = EcuAddress::new(&mut context, 0x1F);
        let text = encode_fragment(&address, &EncodeOptions::default()).unwrap();
        assert_eq!(text, "ECU_ADDRESS 0x1F");

        let decoded: EcuAddress = load_fragment(&text, &mut context).unwrap();
        assert_eq!(decoded.address, 31);

        // a decimal number is not accepted where hex is required
        let result = load_fragment::<EcuAddress>("ECU_ADDRESS 31", &mut context);
        assert!(matches!(
            result,
            Err(A2lError::DecodeError {
                decode_error: DecodeError::ExpectedHexNumber { .. }
            })
        ));
    }

    #[test]
    fn optional_omission() {
        let mut context = BuildContext::new();
        let meas = measurement(&mut context, "SPEED");
        let text = encode_fragment(&meas, &EncodeOptions::default()).unwrap();
        assert_eq!(
            text,
            "/begin MEASUREMENT SPEED \"\" UWORD NO_COMPU_METHOD 1 0 0 6000\n/end MEASUREMENT"
        );

        let decoded: Measurement = load_fragment(&text, &mut context).unwrap();
        assert!(decoded.ecu_address.is_none());
        assert!(decoded.display_identifier.is_none());
        assert!(!decoded.read_write);
        assert!(decoded.if_data.is_empty());
        assert_eq!(decoded, meas);
    }

    #[test]
    fn empty_block() {
        let mut context = BuildContext::new();
        let annotation = Annotation::new(&mut context);
        let text = encode_fragment(&annotation, &EncodeOptions::default()).unwrap();
        assert_eq!(text, "/begin ANNOTATION\n/end ANNOTATION");

        let decoded: Annotation = load_fragment(&text, &mut context).unwrap();
        assert!(decoded.annotation_label.is_none());
        assert!(decoded.annotation_origin.is_none());
        assert!(decoded.annotation_text.is_none());

        let module: Module = load_fragment(r#"/begin MODULE m "" /end MODULE"#, &mut context).unwrap();
        assert!(module.measurement.is_empty());
        assert!(module.compu_vtab.is_empty());
        assert!(module.mod_par.is_none());
    }

    #[test]
    fn duplicate_key_rejected() {
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
          /begin MODULE m ""
            /begin COMPU_VTAB tab "" TAB_VERB 0 /end COMPU_VTAB
            /begin COMPU_VTAB tab "" TAB_VERB 0 /end COMPU_VTAB
          /end MODULE
        /end PROJECT"#;
        let result = asap2::load_from_string(text);
        assert!(matches!(
            result,
            Err(A2lError::DecodeError {
                decode_error: DecodeError::DuplicateName { .. }
            })
        ));

        // the same name in different dictionaries is not a collision
        let text = r#"ASAP2_VERSION 1 71
        /begin PROJECT p ""
          /begin MODULE m ""
            /begin COMPU_VTAB x "" TAB_VERB 0 /end COMPU_VTAB
            /begin MEASUREMENT x "" UBYTE NO_COMPU_METHOD 1 0 0 255 /end MEASUREMENT
          /end MODULE
        /end PROJECT"#;
        assert!(asap2::load_from_string(text).is_ok());
    }

    #[test]
    fn rpm_measurement() {
        let mut context = BuildContext::new();
        let mut rpm = measurement(&mut context, "RPM");
        rpm.bit_mask = Some(BitMask::new(&mut context, 0xFF00));

        let text = encode_fragment(&rpm, &EncodeOptions::default()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("/begin MEASUREMENT RPM "));
        assert_eq!(lines[1].trim(), "BIT_MASK 0xFF00");
        assert_eq!(lines[2], "/end MEASUREMENT");
        assert!(!text.contains("ANNOTATION"));

        let decoded: Measurement = load_fragment(&text, &mut context).unwrap();
        assert!(decoded.annotation.is_none());
        assert_eq!(decoded.bit_mask.as_ref().unwrap().value, 0xFF00);
        assert_eq!(decoded, rpm);
    }

    #[test]
    fn keywords_in_any_order() {
        let mut context = BuildContext::new();
        let text = r#"/begin MEASUREMENT m "" UBYTE NO_COMPU_METHOD 1 0 0 255
            READ_WRITE
            BIT_MASK 0x3
            ECU_ADDRESS 0x100
        /end MEASUREMENT"#;
        let meas: Measurement = load_fragment(text, &mut context).unwrap();
        let output = encode_fragment(&meas, &EncodeOptions::default()).unwrap();
        assert_eq!(
            output,
            "/begin MEASUREMENT m \"\" UBYTE NO_COMPU_METHOD 1 0 0 255\n  ECU_ADDRESS 0x100\n  BIT_MASK 0x3\n  READ_WRITE\n/end MEASUREMENT"
        );
    }

    #[test]
    fn comments_option() {
        let mut context = BuildContext::new();
        let mut vtab = CompuVtab::new(
            &mut context,
            "TAB".to_string(),
            String::new(),
            ConversionType::TabVerb,
            1,
        );
        vtab.entries
            .push(VtabEntry::new(&mut context, 0.0, "off".to_string()));

        let plain = encode_fragment(&vtab, &EncodeOptions::default()).unwrap();
        assert!(!plain.contains("/*"));

        let options = EncodeOptions { comments: true };
        let commented = encode_fragment(&vtab, &options).unwrap();
        assert!(commented.contains("/* NumberValuePairs */"));

        // comments are ignored by the decoder
        let decoded: CompuVtab = load_fragment(&commented, &mut context).unwrap();
        assert_eq!(decoded, vtab);
    }

    #[test]
    fn build_and_write_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.a2l");

        let mut a2l = asap2::new();
        let mut rpm = measurement(&mut a2l.context, "RPM");
        rpm.ecu_address = Some(EcuAddress::new(&mut a2l.context, 0x4000));
        rpm.if_data.push(IfData::new(
            &mut a2l.context,
            "XCP /begin DAQ_EVENT 1 /end DAQ_EVENT".to_string(),
        ));
        let module = &mut a2l.file.project.module[0];
        module.measurement.push(rpm).unwrap();
        let mut constant = SystemConstant::new(&mut a2l.context, "pi".to_string(), "3.14".to_string());
        constant.set_name("PI".to_string());
        let mut mod_par = ModPar::new(&mut a2l.context, String::new());
        mod_par.system_constant.push(constant).unwrap();
        module.mod_par = Some(mod_par);

        a2l.write(&path, Some("written by a test")).unwrap();
        let file_text = std::fs::read_to_string(&path).unwrap();
        assert!(file_text.starts_with("/* written by a test */\n"));

        let (loaded, log_msgs) = asap2::load(&path).unwrap();
        assert!(log_msgs.is_empty());
        assert_eq!(loaded.file, a2l.file);
        let loaded_module = &loaded.file.project.module[0];
        assert_eq!(
            loaded_module.measurement[0].if_data[0].data,
            "XCP /begin DAQ_EVENT 1 /end DAQ_EVENT"
        );
        assert!(loaded_module.mod_par.as_ref().unwrap().system_constant.contains_key("PI"));
    }

    #[test]
    fn if_data_whitespace() {
        let mut a2l = asap2::new();
        let mut rpm = measurement(&mut a2l.context, "RPM");
        rpm.if_data
            .push(IfData::new(&mut a2l.context, "  XCP 1 ".to_string()));
        a2l.file.project.module[0].measurement.push(rpm).unwrap();

        // the padded text can't be read back unchanged
        let result = a2l.write_to_string();
        assert!(matches!(
            result,
            Err(A2lError::EncodeError {
                encode_error: EncodeError::InvalidVerbatimText { .. }
            })
        ));

        a2l.file.project.module[0].measurement[0].if_data[0].data = "XCP 1".to_string();
        let text = a2l.write_to_string().unwrap();
        let (loaded, _) = asap2::load_from_string(&text).unwrap();
        assert_eq!(loaded.file, a2l.file);
    }

    #[test]
    fn include_file() {
        let dir = tempdir().unwrap();
        let main_path = dir.path().join("main.a2l");
        let include_path = dir.path().join("measurements.a2l");
        std::fs::write(
            &include_path,
            r#"/begin MEASUREMENT included "" UBYTE NO_COMPU_METHOD 1 0 0 255 /end MEASUREMENT"#,
        )
        .unwrap();
        std::fs::write(
            &main_path,
            "ASAP2_VERSION 1 71\n/begin PROJECT p \"\"\n/begin MODULE m \"\"\n/include \"measurements.a2l\"\n/end MODULE\n/end PROJECT\n",
        )
        .unwrap();

        let (a2l, _) = asap2::load(&main_path).unwrap();
        assert!(a2l.file.project.module[0].measurement.contains_key("included"));
    }

    #[test]
    fn parsing_weird_data() {
        let load_result = asap2::load_from_string("abcdef");
        assert!(load_result.is_err());

        let load_result = asap2::load_from_string("ASAP2_VERSION 1 71");
        assert!(load_result.is_err());

        let data_bad = r##"ASAP2_VERSION 1 71
        /begin PROJECT
        /end PROJECT"##;
        assert!(asap2::load_from_string(data_bad).is_err());

        let data_bad = r##"ASAP2_VERSION 1 71
        /beginPROJECT x ""
        /end PROJECT"##;
        assert!(matches!(
            asap2::load_from_string(data_bad),
            Err(A2lError::TokenizerError { .. })
        ));

        // unknown keywords inside a known block are an error
        let data_bad = r##"ASAP2_VERSION 1 71
        /begin PROJECT x ""
            UNKNOWN_KEYWORD 1
        /end PROJECT"##;
        assert!(matches!(
            asap2::load_from_string(data_bad),
            Err(A2lError::DecodeError { .. })
        ));
    }

    #[test]
    fn long_masks() {
        let a2l = r#"ASAP2_VERSION 1 71
        /begin PROJECT project ""
            /begin MODULE module ""
                /begin MEASUREMENT measurement_name "long_identifier" FLOAT32_IEEE compu_method_name 1 1.0 0 100
                    BIT_MASK 0xFFFFFFFFFFFFFFFF
                /end MEASUREMENT
            /end MODULE
        /end PROJECT
        "#;
        let (a2l, _) = asap2::load_from_string(a2l).unwrap();

        let measurement = &a2l.file.project.module[0].measurement[0];
        assert_eq!(
            measurement.bit_mask.as_ref().unwrap().value,
            0xFFFFFFFFFFFFFFFFu64
        );
    }

    #[cfg(feature = "check")]
    #[test]
    fn consistency_check() {
        let (a2l, _) = asap2::load_from_string(TEST_A2L).unwrap();
        assert!(a2l.check().is_empty());
    }
}
