//! SQL communication area copybooks supplied by the precompiler.
//!
//! `EXEC SQL INCLUDE SQLCA END-EXEC` must resolve even when the workspace has
//! no such file. The layouts follow the fields the runtime SQLCA tracks.

use crate::config::SqlBackend;
use crate::copybook::registry::CopybookSource;

const DB2_SQLCA: &str = "\
01 SQLCA.
   05 SQLCAID     PIC X(8).
   05 SQLCABC     PIC S9(9) COMP-5.
   05 SQLCODE     PIC S9(9) COMP-5.
   05 SQLERRM.
      49 SQLERRML PIC S9(4) COMP-5.
      49 SQLERRMC PIC X(70).
   05 SQLERRP     PIC X(8).
   05 SQLERRD     OCCURS 6 TIMES PIC S9(9) COMP-5.
   05 SQLWARN.
      10 SQLWARN0 PIC X.
      10 SQLWARN1 PIC X.
      10 SQLWARN2 PIC X.
      10 SQLWARN3 PIC X.
      10 SQLWARN4 PIC X.
      10 SQLWARN5 PIC X.
      10 SQLWARN6 PIC X.
      10 SQLWARN7 PIC X.
      10 SQLWARN8 PIC X.
      10 SQLWARN9 PIC X.
      10 SQLWARNA PIC X.
   05 SQLSTATE    PIC X(5).
";

const DB2_SQLDA: &str = "\
01 SQLDA.
   05 SQLDAID     PIC X(8).
   05 SQLDABC     PIC S9(9) COMP-5.
   05 SQLN        PIC S9(4) COMP-5.
   05 SQLD        PIC S9(4) COMP-5.
   05 SQLVAR      OCCURS 0 TO 750 TIMES DEPENDING ON SQLN.
      10 SQLTYPE  PIC S9(4) COMP-5.
      10 SQLLEN   PIC S9(4) COMP-5.
      10 SQLDATA  USAGE POINTER.
      10 SQLIND   USAGE POINTER.
      10 SQLNAME.
         49 SQLNAMEL PIC S9(4) COMP-5.
         49 SQLNAMEC PIC X(30).
";

const DATACOM_SQLCA: &str = "\
01 SQLCA.
   05 SQLCAID     PIC X(8).
   05 SQLCABC     PIC S9(9) COMP.
   05 SQLCODE     PIC S9(9) COMP.
   05 SQLERRM.
      49 SQLERRML PIC S9(4) COMP.
      49 SQLERRMC PIC X(70).
   05 SQLERRP     PIC X(8).
   05 SQLERRD     OCCURS 6 TIMES PIC S9(9) COMP.
   05 SQLWARN.
      10 SQLWARN0 PIC X.
      10 SQLWARN1 PIC X.
      10 SQLWARN2 PIC X.
      10 SQLWARN3 PIC X.
      10 SQLWARN4 PIC X.
      10 SQLWARN5 PIC X.
      10 SQLWARN6 PIC X.
      10 SQLWARN7 PIC X.
   05 SQLEXT      PIC X(8).
";

/// The predefined copybook `name` for `backend`, if there is one.
pub fn lookup(name: &str, backend: SqlBackend) -> Option<CopybookSource> {
    let upper = name.to_ascii_uppercase();
    let text = match (upper.as_str(), backend) {
        ("SQLCA", SqlBackend::Db2Server) => DB2_SQLCA,
        ("SQLCA", SqlBackend::DatacomServer) => DATACOM_SQLCA,
        ("SQLDA", SqlBackend::Db2Server) => DB2_SQLDA,
        _ => return None,
    };
    let uri = format!("predefined:{}/{}", backend_tag(backend), upper);
    Some(CopybookSource::new(uri, text))
}

fn backend_tag(backend: SqlBackend) -> &'static str {
    match backend {
        SqlBackend::Db2Server => "db2",
        SqlBackend::DatacomServer => "datacom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlca_per_backend() {
        let db2 = lookup("sqlca", SqlBackend::Db2Server).unwrap();
        assert_eq!(db2.uri.as_ref(), "predefined:db2/SQLCA");
        assert!(db2.text.contains("SQLSTATE"));

        let datacom = lookup("SQLCA", SqlBackend::DatacomServer).unwrap();
        assert!(datacom.text.contains("SQLEXT"));
        assert!(!datacom.text.contains("SQLSTATE"));
    }

    #[test]
    fn test_sqlda_db2_only() {
        assert!(lookup("SQLDA", SqlBackend::Db2Server).is_some());
        assert!(lookup("SQLDA", SqlBackend::DatacomServer).is_none());
        assert!(lookup("OTHER", SqlBackend::Db2Server).is_none());
    }
}
