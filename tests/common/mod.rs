use std::sync::Once;

static INIT: Once = Once::new();

/// Route library events to the test harness output.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    });
}

pub const SAMPLE: &str = r#"# Please check if all the paths in PATH are reachable, remove the ones that
# are not.

PATH=$HOME/bin:/usr/bin:/usr/ucb:/bin:/usr/local/bin:.
MAILDIR=$HOME/Mail      # You'd better make sure it exists
DEFAULT=$MAILDIR/mbox
LOCKFILE=$HOME/.lockmail
SUBJECT=`formail -xSubject:` NOTE="say \"hi\"" BARE EMPTY=

# title: Mailing lists
# comment: one folder per list
:0 Hc: lists.lock
* ^TO_procmail@informatik\.rwth-aachen\.de
procmail/

:0 B
# only large bodies
* > 100000
* ! ^X-Loop: me@example\.com
* $ ^From:.*${SENDER}
* 2000 ^ 1 ^Subject:.*(buy|cheap)
* -100 ^ 0 H ?? ^X-Spam-Flag: NO
# drop it
/dev/null

:0
* ^From:.*boss
{
    :0 c
    ! secretary@example.com other@example.com

    :0 fw
    | formail -A "X-Boss: yes"

    LOG="boss mail"
    # nested comment
    :0:
    boss/
}

:0 W
* ? test -f $HOME/.vacation
RESULT=| vacation $LOGNAME
"#;
