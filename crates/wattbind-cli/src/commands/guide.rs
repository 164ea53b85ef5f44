//! Usage walkthrough.

pub fn run() {
    let text = "\
Wattbind usage

Start by listing a campus's buildings:
    wattbind --user <id> query <campus>
Then query a specific room directly:
    wattbind --user <id> query <campus> <building> <room>
Rooms in zoned buildings need the zone prefix in the room number (e.g. A233).

Bind a room to skip the arguments:
    wattbind --user <id> bind <campus> <building> <room>
    wattbind --user <id> query
Use --group <id> instead of --user <id> to act for a group chat.

After binding:
    wattbind --user <id> schedule set 08:00    daily balance report
    wattbind --user <id> schedule cancel
    wattbind --user <id> clear                 drop the stored history
    wattbind --user <id> unbind                also removes the schedule

Run the daily report daemon:
    wattbind serve";

    println!("{text}");
}
