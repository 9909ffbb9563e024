/*!

This is the long-form manual for `attendance` and `hkn-tracker`.

## Input data

Two spreadsheets are collected with Google Forms and published as CSV:

* the **responses**: one line per self-report of an officer, with the columns
  `HKN Handle`, `Week`, `Secret Word` and `Activity Type`
* the **events**: one line per activity that officially took place, with the
  columns `Week`, `Secret Word` and `Activity Type`

Other columns (timestamps, e-mail addresses, ...) are ignored.

The secret word is announced during the activity. A self-report only counts if
an event of the same type was logged for the same week with the same secret
word.

## Activity types

| Activity Type          | Summary column                   |
|------------------------|----------------------------------|
| `HM`                   | `HMs Attended`                   |
| `Cookie Run`           | `Cookie Runs Attended`           |
| `Teaching Session`     | `Teaching Sessions Attended`     |
| `CM`                   | `CMs Attended`                   |
| `GM`                   | `GMs Attended`                   |
| `Inter-Committee Duty` | `Inter-Committee Dutys Attended` |
| `QSM`                  | `QSMs Attended`                  |

Any other activity type is ignored.

## Matching rules

* handles and secret words are compared after trimming and lowercasing
* activity types are compared exactly (modulo surrounding spaces)
* weeks that are whole numbers are compared by value (`01` and `1.0` are
  week `1`), anything else is compared as text
* a report with a blank handle never counts. A blank secret word is a
  secret word like any other: it matches an event of the same week and type
  that was logged without secret word
* if the same event was logged twice, or a person submitted the same report
  twice, the attendance is counted twice. Clean up the spreadsheets if this
  happens.

## Output

The summary has one line per person with at least one valid attendance, sorted
by handle, and one integer column per activity type. People who never
attended anything are not listed: there is no roster of officers.

## Running the Slack bot

The `hkn-tracker serve` command runs the webhook for a Slack slash command.
It needs the following settings, which may be put in a `.env` file:

* `RESPONSES_URL`, `EVENTS_URL`: the CSV export URLs of the two spreadsheets
* `SLACK_BOT_TOKEN`: the bot token, used to send the ephemeral reply
* `SUPPORT_CONTACT` (optional): the Slack user id mentioned for bug reports

The spreadsheets are downloaded at most once a week (see `--max-age-hours`).
Use `hkn-tracker refresh` to download them immediately.

*/
