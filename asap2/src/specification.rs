use crate::DecodeError;
use crate::itemlist::ItemList;
use crate::node::{
    A2lObjectName, A2lObjectNameSetter, EnumLabel, FieldRef, Node, NodeType, ScalarRef, ToScalar,
};
use crate::schema::{
    EnumSchema, FieldDescriptor, FieldRole, Keyword, NodeKind, NodeSchema, ValueType,
};
use crate::sequence::{BuildContext, SequenceNumber};
use crate::value::{FromValue, RawNode, Value};
use asap2macros::a2l_specification;

a2l_specification! {
    /// The root of an a2l file
    document A2L_FILE {
        0 [-> ASAP2_VERSION]
        1 [-> A2ML_VERSION]
        2 [-> PROJECT]!
    }

    /// The version of the ASAP2 standard that the file follows, e.g. `ASAP2_VERSION 1 71`
    keyword ASAP2_VERSION {
        0 uint version_no
        1 uint upgrade_no
    }

    keyword A2ML_VERSION {
        0 uint version_no
        1 uint upgrade_no
    }

    block PROJECT {
        #[key]
        #[comment = " Name           "]
        0 ident name
        #[comment = " LongIdentifier "]
        1 string long_identifier
        2 [-> HEADER]
        #[dict]
        3 [-> MODULE]*
    }

    block HEADER {
        0 string comment
        1 "VERSION" string
        2 "PROJECT_NO" ident
    }

    /// A module describes one ECU: its memory layout, its measurements and calibration objects
    block MODULE {
        #[key]
        0 ident name
        #[comment = " LongIdentifier "]
        1 string long_identifier
        2 [-> A2ML]*
        #[dict]
        3 [-> IF_DATA]*
        4 [-> MOD_COMMON]
        5 [-> MOD_PAR]
        #[dict]
        #[comment = " Measurement data for the module "]
        6 [-> MEASUREMENT]*
        #[dict]
        7 [-> CHARACTERISTIC]*
        #[dict]
        #[comment = " Verbal conversion tables for the module "]
        8 [-> COMPU_VTAB]*
        #[dict]
        #[comment = " Verbal conversion tables with parameter ranges for the module "]
        9 [-> COMPU_VTAB_RANGE]*
    }

    /// The A2ML description of the IF_DATA content; it is carried as unparsed text
    block A2ML {
        0 verbatim data
    }

    /// Interface specific data. The content is carried as unparsed text, and the first word
    /// of the content (the interface name) is used as the key.
    block IF_DATA {
        #[key]
        0 verbatim data
    }

    block MOD_COMMON {
        #[comment = " Comment "]
        0 string comment
        #[dict]
        1 [-> ALIGNMENT]*
        2 [-> BYTE_ORDER]
        3 "DATA_SIZE" ulong
        4 [-> DEPOSIT]
        5 "S_REC_LAYOUT" ident
    }

    /// One of the ALIGNMENT_* statements; the keyword selects the data type
    keyword ALIGNMENT {
        #[key]
        0 nametoken AlignmentType alignment_type
        1 uint border
    }

    keyword BYTE_ORDER {
        0 ByteOrderEnum value
    }

    keyword DEPOSIT {
        0 DepositMode value
    }

    keyword CALIBRATION_ACCESS {
        0 CalibrationAccessEnum value
    }

    block MOD_PAR {
        0 string comment
        1 [-> ADDR_EPK]*
        2 [-> CALIBRATION_METHOD]*
        3 "CPU_TYPE" string
        4 "CUSTOMER" string
        5 "CUSTOMER_NO" string
        6 "ECU" string
        7 "ECU_CALIBRATION_OFFSET" int64
        8 "EPK" string
        9 [-> MEMORY_LAYOUT]*
        10 [-> MEMORY_SEGMENT]*
        11 "NO_OF_INTERFACES" ulong
        12 "PHONE_NO" string
        13 "SUPPLIER" string
        #[dict]
        14 [-> SYSTEM_CONSTANT]*
        15 "USER" string
        16 "VERSION" string
    }

    keyword ADDR_EPK {
        0 hex ulong address
    }

    block CALIBRATION_METHOD {
        #[comment = " Method  "]
        0 string method
        #[comment = " Version "]
        1 ulong version
        2 [-> CALIBRATION_HANDLE]
    }

    block CALIBRATION_HANDLE {
        #[comment = " Handles "]
        #[newline]
        0 hex ulong handles*
        1 "CALIBRATION_HANDLE_TEXT" string
    }

    keyword SYSTEM_CONSTANT {
        #[key]
        0 string name
        1 string value
    }

    block MEMORY_LAYOUT {
        #[comment = " Program segment type "]
        0 MemoryLayoutPrgType prg_type
        #[comment = " Address              "]
        1 hex ulong address
        #[comment = " Size                 "]
        2 hex ulong size
        #[comment = " offset               "]
        3 int64 offset_0
        4 int64 offset_1
        5 int64 offset_2
        6 int64 offset_3
        7 int64 offset_4
        8 [-> IF_DATA]*
    }

    block MEMORY_SEGMENT {
        #[key]
        0 ident name
        1 string long_identifier
        #[comment = " PrgTypes   "]
        2 PrgType prg_type
        #[comment = " MemoryType "]
        3 MemoryType memory_type
        #[comment = " Attribute  "]
        4 MemoryAttribute attribute
        #[comment = " Address    "]
        5 hex ulong address
        #[comment = " Size       "]
        6 hex ulong size
        #[comment = " offset     "]
        7 int64 offset_0
        8 int64 offset_1
        9 int64 offset_2
        10 int64 offset_3
        11 int64 offset_4
        12 [-> IF_DATA]*
    }

    /// A value that is measured while the ECU is running
    block MEASUREMENT {
        #[key]
        #[comment = " Name           "]
        0 ident name
        #[comment = " LongIdentifier "]
        1 string long_identifier
        #[comment = " Datatype       "]
        2 DataType datatype
        #[comment = " Conversion     "]
        3 ident conversion
        #[comment = " Resolution     "]
        4 uint resolution
        #[comment = " Accuracy       "]
        5 double accuracy
        #[comment = " LowerLimit     "]
        6 double lower_limit
        #[comment = " UpperLimit     "]
        7 double upper_limit
        8 "DISPLAY_IDENTIFIER" ident
        9 [-> ECU_ADDRESS]
        10 [-> ECU_ADDRESS_EXTENSION]
        11 [-> ARRAY_SIZE]
        12 [-> FORMAT]
        13 [-> BIT_MASK]
        14 [-> BIT_OPERATION]
        15 [-> MATRIX_DIM]
        16 [-> ANNOTATION]
        17 "READ_WRITE" flag
        18 [-> IF_DATA]*
    }

    /// An adjustable object in the ECU memory
    block CHARACTERISTIC {
        #[key]
        #[comment = " Name           "]
        0 ident name
        #[comment = " LongIdentifier "]
        1 string long_identifier
        #[comment = " Type           "]
        2 CharacteristicType characteristic_type
        #[comment = " Address        "]
        3 hex ulong address
        #[comment = " Deposit        "]
        4 ident deposit
        #[comment = " MaxDiff        "]
        5 double max_diff
        #[comment = " Conversion     "]
        6 ident conversion
        #[comment = " LowerLimit     "]
        7 double lower_limit
        #[comment = " UpperLimit     "]
        8 double upper_limit
        9 [-> ANNOTATION]
        10 [-> BIT_MASK]
        11 [-> BYTE_ORDER]
        12 [-> CALIBRATION_ACCESS]
        13 "DISPLAY_IDENTIFIER" ident
        14 [-> ECU_ADDRESS_EXTENSION]
        15 [-> FORMAT]
        16 [-> MATRIX_DIM]
        17 "NUMBER" uint
        18 "READ_ONLY" flag
        19 [-> IF_DATA]*
    }

    keyword ECU_ADDRESS {
        0 hex ulong address
    }

    keyword ECU_ADDRESS_EXTENSION {
        0 hex ulong extension
    }

    keyword BIT_MASK {
        0 hex ulong value
    }

    keyword ARRAY_SIZE {
        0 ulong value
    }

    keyword RIGHT_SHIFT {
        0 ulong bitcount
    }

    keyword LEFT_SHIFT {
        0 ulong bitcount
    }

    /// printf style display format, e.g. "%6.2"
    keyword FORMAT {
        0 string value
    }

    keyword MATRIX_DIM {
        0 uint dim_x
        1 uint dim_y
        2 uint dim_z
    }

    block BIT_OPERATION {
        0 [-> RIGHT_SHIFT]
        1 [-> LEFT_SHIFT]
        2 "SIGN_EXTEND" flag
    }

    block ANNOTATION {
        0 [-> ANNOTATION_LABEL]
        1 [-> ANNOTATION_ORIGIN]
        2 [-> ANNOTATION_TEXT]
    }

    keyword ANNOTATION_LABEL {
        0 string label
    }

    keyword ANNOTATION_ORIGIN {
        0 string origin
    }

    block ANNOTATION_TEXT {
        #[newline]
        0 string text*
    }

    /// A conversion table that maps input values to text
    block COMPU_VTAB {
        #[key]
        #[comment = " Name           "]
        0 ident name
        #[comment = " LongIdentifier "]
        1 string long_identifier
        #[comment = " ConversionType "]
        2 ConversionType conversion_type
        #[comment = " NumberValuePairs "]
        3 uint number_value_pairs
        4 [-> VTAB_ENTRY]* as entries
        5 "DEFAULT_VALUE" string
    }

    /// One `value "text"` pair of a COMPU_VTAB
    anonymous VTAB_ENTRY {
        0 double in_val
        1 string out_val
    }

    /// A conversion table that maps ranges of input values to text
    block COMPU_VTAB_RANGE {
        #[key]
        #[comment = " Name               "]
        0 ident name
        #[comment = " LongIdentifier     "]
        1 string long_identifier
        #[comment = " NumberValueTriples "]
        2 uint number_value_triples
        3 [-> VTAB_RANGE_ENTRY]* as entries
        4 "DEFAULT_VALUE" string
    }

    anonymous VTAB_RANGE_ENTRY {
        0 double in_val_min
        1 double in_val_max
        2 string out_val
    }

    enum AlignmentType {
        ALIGNMENT_BYTE,
        ALIGNMENT_WORD,
        ALIGNMENT_LONG,
        ALIGNMENT_INT64,
        ALIGNMENT_FLOAT32_IEEE,
        ALIGNMENT_FLOAT64_IEEE
    }

    enum ByteOrderEnum {
        LITTLE_ENDIAN,
        BIG_ENDIAN,
        MSB_FIRST,
        MSB_LAST
    }

    enum DepositMode {
        ABSOLUTE,
        DIFFERENCE
    }

    enum CalibrationAccessEnum {
        CALIBRATION,
        NO_CALIBRATION,
        NOT_IN_MCD_SYSTEM,
        OFFLINE_CALIBRATION
    }

    /// The data type of a measurement
    enum DataType {
        UBYTE,
        SBYTE,
        UWORD,
        SWORD,
        ULONG,
        SLONG,
        A_UINT64,
        A_INT64,
        FLOAT16_IEEE,
        FLOAT32_IEEE,
        FLOAT64_IEEE
    }

    enum CharacteristicType {
        ASCII,
        CURVE,
        MAP,
        CUBOID,
        CUBE_4,
        CUBE_5,
        VAL_BLK,
        VALUE
    }

    enum ConversionType {
        TAB_VERB
    }

    /// The program segment type of a MEMORY_SEGMENT
    enum PrgType {
        CALIBRATION_VARIABLES,
        CODE,
        DATA,
        EXCLUDE_FROM_FLASH,
        OFFLINE_DATA,
        RESERVED,
        SERAM,
        VARIABLES
    }

    enum MemoryType {
        EEPROM,
        EPROM,
        FLASH,
        RAM,
        ROM,
        REGISTER
    }

    enum MemoryAttribute {
        INTERN,
        EXTERN
    }

    /// The program segment type of a MEMORY_LAYOUT
    enum MemoryLayoutPrgType {
        PRG_CODE,
        PRG_DATA,
        PRG_RESERVED
    }
}
